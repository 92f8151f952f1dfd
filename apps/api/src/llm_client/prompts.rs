// Shared prompt fragments used by more than one caller of the LLM client.
// Stage-specific templates live in discovery/prompts.rs.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON value. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// System prompt for plain summarization.
pub const SUMMARIZE_SYSTEM: &str = "You summarize customer discovery notes for a \
    sales team. Reply with a short plain-text summary of at most four sentences. \
    Do not invent facts that are not in the notes.";
