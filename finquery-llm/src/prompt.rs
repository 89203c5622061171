//! Prompt builders for translation and synthesis.

use finquery_core::{Record, TenantId, TENANT_FIELD};

use crate::CompletionRequest;

/// Translation is deterministic.
pub const TRANSLATION_TEMPERATURE: f32 = 0.0;
pub const SYNTHESIS_TEMPERATURE: f32 = 0.3;

const TRANSLATION_MAX_TOKENS: i32 = 800;
const SYNTHESIS_MAX_TOKENS: i32 = 600;

/// Retrieved rows beyond this count are summarized as "N more rows".
pub const MAX_ROWS_IN_PROMPT: usize = 50;

/// Build the translation prompt.
pub fn translation_request(schema: &str, tenant_id: &TenantId, question: &str) -> CompletionRequest {
    let system = format!(
        "You translate questions about a user's personal finances into a single \
         database query. Respond with ONLY a JSON object, no prose.\n\n\
         {schema}\n\
         Query shape:\n\
         {{\"collection\": <collection name>, \"operation\": \"find\" | \"find_one\" | \"aggregate\", \
         \"filter\": {{...}}, \"projection\": {{...}}, \"pipeline\": [...]}}\n\n\
         Rules:\n\
         - Use \"filter\" (and optionally \"projection\") for find/find_one; use \"pipeline\" for aggregate.\n\
         - Use aggregate for totals, averages, counts, and per-category breakdowns.\n\
         - Every query on a collection scoped by {field} must restrict {field} to \"{tenant}\". \
           For aggregate, the first stage must be {{\"$match\": {{\"{field}\": \"{tenant}\"}}}}.\n\
         - Supported filter operators: $eq $ne $gt $gte $lt $lte $in $nin $regex $exists $and $or.\n\
         - Supported stages: $match $group $sort $limit $skip $project $addFields $set $count $unwind.\n\
         - Dates are ISO 8601 strings (YYYY-MM-DD) and compare as strings.\n\
         - Equity value is {{\"$multiply\": [\"$quantity\", \"$currentPrice\"]}}.",
        schema = schema,
        field = TENANT_FIELD,
        tenant = tenant_id,
    );

    CompletionRequest {
        system,
        user: question.to_string(),
        max_tokens: TRANSLATION_MAX_TOKENS,
        temperature: TRANSLATION_TEMPERATURE,
    }
}

/// Build the synthesis prompt.
pub fn synthesis_request(tenant_name: &str, question: &str, retrieved: &[Record]) -> CompletionRequest {
    let system = format!(
        "You are a friendly personal finance assistant talking to {name}. \
         Answer the question using only the data provided. Amounts are in Indian \
         rupees. State totals as plain numbers, be concise, and if the data is \
         empty say that no matching records were found.",
        name = tenant_name,
    );

    let shown = &retrieved[..retrieved.len().min(MAX_ROWS_IN_PROMPT)];
    let mut data = serde_json::to_string_pretty(shown).unwrap_or_else(|_| "[]".to_string());
    if retrieved.len() > shown.len() {
        data.push_str(&format!("\n({} more rows not shown)", retrieved.len() - shown.len()));
    }

    CompletionRequest {
        system,
        user: format!("Question: {}\n\nData:\n{}", question, data),
        max_tokens: SYNTHESIS_MAX_TOKENS,
        temperature: SYNTHESIS_TEMPERATURE,
    }
}
