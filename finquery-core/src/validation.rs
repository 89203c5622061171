//! Request validation, run before any external call.

use crate::error::ValidationError;
use crate::tenant::TenantContext;

/// Validate a question's shape.
///
/// The question must be non-empty after trimming and at most `max_len`
/// characters long (counted as Unicode scalar values, untrimmed).
pub fn validate_question(question: &str, max_len: usize) -> Result<(), ValidationError> {
    if question.trim().is_empty() {
        return Err(ValidationError::EmptyQuestion);
    }
    let len = question.chars().count();
    if len > max_len {
        return Err(ValidationError::QuestionTooLong { len, max: max_len });
    }
    Ok(())
}

/// Validate that both tenant fields are present.
pub fn validate_tenant(tenant: &TenantContext) -> Result<(), ValidationError> {
    if tenant.tenant_id.is_blank() {
        return Err(ValidationError::RequiredFieldMissing {
            field: "tenantId".to_string(),
        });
    }
    if tenant.tenant_name.trim().is_empty() {
        return Err(ValidationError::RequiredFieldMissing {
            field: "tenantName".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_question_rejected() {
        assert_eq!(validate_question("   \n\t", 500), Err(ValidationError::EmptyQuestion));
    }

    #[test]
    fn test_length_boundary() {
        let exact = "a".repeat(500);
        assert!(validate_question(&exact, 500).is_ok());

        let over = "a".repeat(501);
        assert_eq!(
            validate_question(&over, 500),
            Err(ValidationError::QuestionTooLong { len: 501, max: 500 })
        );
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let rupees = "₹".repeat(500);
        assert!(rupees.len() > 500);
        assert!(validate_question(&rupees, 500).is_ok());
    }

    #[test]
    fn test_tenant_fields_required() {
        assert!(validate_tenant(&TenantContext::new("user_1", "Asha")).is_ok());
        assert_eq!(
            validate_tenant(&TenantContext::new("", "Asha")),
            Err(ValidationError::RequiredFieldMissing {
                field: "tenantId".to_string()
            })
        );
        assert_eq!(
            validate_tenant(&TenantContext::new("user_1", " ")),
            Err(ValidationError::RequiredFieldMissing {
                field: "tenantName".to_string()
            })
        );
    }
}
