//! HTML views
//!
//! Server-rendered pages: the input form (generated from the schema), the
//! result page and the three-line glossary table.

use std::collections::HashMap;
use std::fmt::Write;

use birth_trauma_core::constants::OUTCOME_NAME;
use birth_trauma_core::logic::features::{glossary, schema, vector::format_value, FeatureKind, FeatureSpec, InputError};
use birth_trauma_core::logic::render::svg::escape;
use birth_trauma_core::Assessment;

const STYLE: &str = r#"
body { font-family: 'Noto Sans CJK SC', 'Microsoft YaHei', sans-serif; margin: 2rem auto; max-width: 1240px; color: #222; }
h1 { font-size: 1.5rem; }
form .grid { display: grid; grid-template-columns: repeat(4, 1fr); gap: .6rem 1.2rem; }
label { display: flex; flex-direction: column; font-size: .85rem; }
label.invalid input, label.invalid select { border: 2px solid #c62828; }
.errors { color: #c62828; }
.score { font-size: 1.4rem; font-weight: bold; margin: 1rem 0; }
.notice { color: #8a6d00; }
table.three-line { border-collapse: collapse; border-top: 2px solid #000; border-bottom: 2px solid #000; margin-top: 1.5rem; }
table.three-line th { border-bottom: 1px solid #000; }
table.three-line th, table.three-line td { padding: .2rem .8rem; text-align: left; }
.pos { color: #ff0d57; } .neg { color: #1e88e5; }
.intro { color: #444; max-width: 60rem; }
"#;

const INTRO: &str = "通过输入所有变量的值进行单个样本分娩心理创伤的风险预测，可以得到该样本罹患分娩心理创伤的概率，并结合 SHAP 力图分析结果，有助于临床医护人员了解具体的风险因素和保护因素。";

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"zh\">\n<head><meta charset=\"utf-8\"><title>{}</title><style>{}</style></head>\n<body>\n{}\n</body>\n</html>\n",
        escape(title),
        STYLE,
        body
    )
}

// ============================================================================
// FORM
// ============================================================================

fn field(spec: &FeatureSpec, submitted: Option<&str>, invalid: bool) -> String {
    let class = if invalid { " class=\"invalid\"" } else { "" };
    let name = escape(spec.name);
    let control = match spec.kind {
        FeatureKind::Numerical { min, max, default } => {
            let value = submitted.map(str::to_string).unwrap_or_else(|| format_value(default));
            format!(
                "<input type=\"number\" name=\"{}\" min=\"{}\" max=\"{}\" step=\"any\" value=\"{}\">",
                name,
                format_value(min),
                format_value(max),
                escape(&value)
            )
        }
        FeatureKind::Categorical { options } => {
            let selected = submitted
                .and_then(|s| s.trim().parse::<f64>().ok())
                .unwrap_or_else(|| spec.default_value());
            let mut html = format!("<select name=\"{}\">", name);
            for &option in options {
                let mark = if option as f64 == selected { " selected" } else { "" };
                let _ = write!(html, "<option value=\"{o}\"{}>{o}</option>", mark, o = option);
            }
            html.push_str("</select>");
            html
        }
    };
    format!("<label{}>{} {}{}</label>", class, escape(spec.code), name, control)
}

fn form(submitted: &HashMap<String, String>, errors: &[InputError]) -> String {
    let mut html = String::new();
    if !errors.is_empty() {
        html.push_str("<ul class=\"errors\">");
        for e in errors {
            let _ = write!(html, "<li>{}</li>", escape(&e.to_string()));
        }
        html.push_str("</ul>");
    }

    html.push_str("<form method=\"post\" action=\"/assess\"><div class=\"grid\">");
    for spec in schema() {
        let invalid = errors.iter().any(|e| e.feature() == spec.name);
        html.push_str(&field(spec, submitted.get(spec.name).map(String::as_str), invalid));
    }
    html.push_str("</div><p><button type=\"submit\">Predict</button></p></form>");
    html
}

/// Code / 变量 / English, top, header and bottom rules only
pub fn glossary_table() -> String {
    let mut html = String::from(
        "<table class=\"three-line\"><thead><tr><th>Code</th><th>变量</th><th>Variable</th></tr></thead><tbody>",
    );
    for entry in glossary() {
        let _ = write!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&entry.code),
            escape(&entry.name),
            escape(&entry.english)
        );
    }
    html.push_str("</tbody></table>");
    html
}

pub fn index_page(submitted: &HashMap<String, String>, errors: &[InputError]) -> String {
    let body = format!(
        "<h1>{} risk assessment</h1>\n<p class=\"intro\">{}</p>\n{}\n{}",
        OUTCOME_NAME,
        INTRO,
        form(submitted, errors),
        glossary_table()
    );
    page(&format!("{} risk", OUTCOME_NAME), &body)
}

// ============================================================================
// RESULT
// ============================================================================

pub fn result_page(assessment: &Assessment, svg: Option<&str>, submitted: &HashMap<String, String>) -> String {
    let mut body = format!(
        "<h1>{} risk assessment</h1>\n<div class=\"score\">{}</div>\n",
        OUTCOME_NAME,
        escape(&assessment.score_text())
    );

    for d in &assessment.degraded {
        let _ = writeln!(body, "<p class=\"notice\">{:?} unavailable: {}</p>", d.stage, escape(&d.reason));
    }

    if let Some(svg) = svg {
        let _ = writeln!(body, "<div class=\"plot\">{}</div>", svg);
    }

    if let Some(e) = &assessment.explanation {
        let _ = write!(
            body,
            "<table class=\"three-line\"><thead><tr><th>Feature</th><th>Value</th><th>SHAP</th></tr></thead><tbody><tr><td>base value</td><td></td><td>{:.4}</td></tr>",
            e.baseline
        );
        for c in &assessment.contributions {
            let class = if c.attribution > 0.0 { "pos" } else { "neg" };
            let _ = write!(
                body,
                "<tr><td>{} {}</td><td>{}</td><td class=\"{}\">{:+.4}</td></tr>",
                escape(&c.code),
                escape(&c.name),
                format_value(c.value),
                class,
                c.attribution
            );
        }
        body.push_str("</tbody></table>\n");
    }

    body.push_str("<h2>Inputs</h2>\n");
    body.push_str(&form(submitted, &[]));
    body.push_str(&glossary_table());
    page(&assessment.score_text(), &body)
}
