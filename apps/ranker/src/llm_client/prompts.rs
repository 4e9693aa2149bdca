// Cross-cutting prompt fragments. Each scorer that calls the LLM keeps its own
// prompts alongside it and composes these.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Keeps model verdicts tied to the supplied text.
pub const EVIDENCE_INSTRUCTION: &str = "\
    CRITICAL: Base every judgement only on the candidate text provided. \
    Do NOT infer traits that are not supported by a phrase in the text. \
    Ignore the candidate's name, gender, age, origin and any other personal attribute.";
