// Discovery pipeline prompt templates.
// Placeholders in braces are filled with `str::replace` before the call.

pub const ANALYSIS_SYSTEM: &str = "\
You are an expert ML platform consultant helping an Account Executive understand a \
customer's current situation. Be professional and sales-focused. Ground every \
statement in the provided notes.";

pub const ANALYSIS_PROMPT: &str = r#"Analyze this customer discovery information and provide insights for a Snowflake Account Executive.

CUSTOMER CONTENT:
{content}

Please provide:
1. A concise summary of the customer's current situation
2. 3-4 key takeaways about their ML challenges and opportunities
3. Specific pain points that Snowflake ML could address

Keep the response professional and sales-focused."#;

pub const CLASSIFY_PROMPT: &str = r#"Classify the following text. Choose every label that applies from this list and no others:
{labels}

TEXT:
{content}

Return a JSON array of the chosen label strings, e.g. ["Analytics"]. Return [] if none apply."#;

/// Workload categories offered to the classifier.
pub const WORKLOAD_CLASSES: &[&str] = &[
    "Data Engineering",
    "Machine Learning Training",
    "Model Inference",
    "MLOps",
    "Data Science",
    "Analytics",
    "Real-time Processing",
    "Computer Vision",
    "NLP",
    "Recommendation Systems",
];

pub const STRATEGY_TEMPERATURE: f32 = 0.3;

pub const STRATEGY_SYSTEM: &str = "\
You are an expert Snowflake sales consultant helping an Account Executive win ML workloads. \
You MUST respond with a single JSON object only, with no markdown fences or commentary.";

pub const STRATEGY_PROMPT: &str = r#"CUSTOMER INFORMATION:
{customer_json}

REFERENCE KNOWLEDGE (Success Stories & Best Practices):
{reference_knowledge}

Based on this information, provide a comprehensive analysis in the following JSON format:
{
  "executive_summary": "Brief 3-sentence summary of the opportunity",
  "competitive_analysis": {
    "current_platforms": ["list of identified competing platforms"],
    "snowflake_advantages": ["specific advantages Snowflake offers"],
    "competitive_risks": ["potential obstacles or risks"]
  },
  "compute_upside": {
    "estimated_workloads": "Description of ML workloads that could move to Snowflake",
    "potential_compute_increase": "Estimated percentage increase in compute usage",
    "revenue_opportunity": "Qualitative assessment of revenue potential"
  },
  "strategy": {
    "short_term": ["immediate next steps (30-90 days)"],
    "long_term": ["strategic initiatives (6-12 months)"]
  },
  "discovery_questions": ["key questions to ask in next customer conversation"],
  "poc_recommendations": ["specific proof-of-concept ideas"],
  "risks_to_avoid": ["things to be careful about or avoid"]
}

Be specific, actionable, and grounded in Snowflake's ML capabilities. Reference similar customer success stories where relevant."#;

/// Used in the strategy prompt when no reference knowledge has been loaded.
pub const NO_REFERENCE_KNOWLEDGE: &str = "Reference knowledge not yet loaded.";
