/// Instruction block for transaction recognition. The model sees recognized
/// statement text, not the original document, so the prompt spells out the
/// Brazilian conventions the text will use.
const RECOGNITION_INSTRUCTIONS: &str = r#"Extract every transaction from the bank statement text below.

Respond with ONLY a JSON array, no explanations and no markdown. Each element:
{
  "date": "ISO-8601 date (YYYY-MM-DD)",
  "description": "merchant or transaction description",
  "amount": unsigned number in the statement currency,
  "type": "income" | "expense" | "transfer",
  "category": "food" | "transport" | "shopping" | "entertainment" | "healthcare" | "bills" | "income" | "other",
  "confidence": number between 0.0 and 1.0
}

The statement text uses Brazilian conventions:
- dates are day/month/year (05/03/2024 is March 5th)
- amounts use comma as the decimal separator and dot for thousands (1.234,56)
- "amount" in your output must always be positive; "type" carries the direction

Skip balance lines, totals and headers. Do not invent transactions."#;

/// Assemble the full prompt for a recognized statement.
pub fn build_prompt(statement_text: &str) -> String {
    format!("{RECOGNITION_INSTRUCTIONS}\n\nStatement text:\n{statement_text}")
}
