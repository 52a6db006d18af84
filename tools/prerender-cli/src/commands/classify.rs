//! Request classification command.

use anyhow::{Context as _, Result};
use http::Method;
use prerender_classify::{likely_html, RequestClassifier};
use serde::Serialize;

use super::ClassifyArgs;
use crate::context::Context;
use crate::output::classification_badge;

#[derive(Serialize)]
struct ClassifyReport<'a> {
    method: &'a str,
    path: &'a str,
    classification: &'static str,
    signature: Option<&'a str>,
    likely_html: bool,
}

/// Run the classify command.
pub async fn run(args: ClassifyArgs, ctx: &Context) -> Result<()> {
    let config = ctx.gateway_config_or_default(None)?;
    let classifier = RequestClassifier::from_config(&config)?;

    let method: Method = args
        .method
        .to_uppercase()
        .parse()
        .with_context(|| format!("Invalid HTTP method: {}", args.method))?;

    let classification = classifier.classify(&method, &args.path, &args.user_agent, &args.accept);
    let report = ClassifyReport {
        method: method.as_str(),
        path: &args.path,
        classification: classification.name(),
        signature: classifier.matched_signature(&args.user_agent),
        likely_html: likely_html(&method, &args.accept),
    };

    if ctx.output.is_json() {
        ctx.output.json(&report);
        return Ok(());
    }

    ctx.output.header("Classification");
    ctx.output.kv("request", &format!("{} {}", report.method, report.path));
    ctx.output.kv("result", &classification_badge(classification));
    ctx.output
        .kv("signature", report.signature.unwrap_or("(none)"));
    ctx.output.kv("likely html", &report.likely_html.to_string());

    Ok(())
}
