//! Single-page notes form. Submits to `POST /report`.

use axum::response::Html;

use crate::discovery::report::page;

const EXAMPLE_NOTES: &str = "Customer: DataFlow Analytics, $500M ARR B2B SaaS
Current Platform: Databricks Premium on AWS
Pain Points: Monthly bill went from $80K to $220K in 6 months
Team: 25-person data science team, struggling with cluster management
Timeline: Evaluating alternatives through Q1, CFO mandate to reduce costs by 30%";

/// GET /
pub async fn form_page() -> Html<String> {
    let body = format!(
        r#"<h1>ML Workload Discovery</h1>
<p>Paste customer discovery notes, meeting transcripts, or pain points.</p>
<form method="post" action="/report">
<textarea name="notes" rows="14" cols="90" placeholder="{placeholder}" required></textarea>
<p><button type="submit">Analyze</button></p>
</form>
<p>Detected platforms: AWS SageMaker, Databricks, Azure ML, Google Vertex AI, Excel/Manual, Local/Custom.</p>"#,
        placeholder = crate::discovery::report::escape_html(EXAMPLE_NOTES)
    );
    Html(page("ML Workload Discovery", &body))
}
