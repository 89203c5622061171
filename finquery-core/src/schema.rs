//! Static description of the four collections.
//!
//! Fixed at compile time. The translation collaborator receives the
//! rendered text from [`describe`]; the HTTP layer exposes the structured
//! form from [`collections`].

use serde::Serialize;

use crate::query::{Collection, TENANT_FIELD};

/// Value type of a document field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Number,
    Integer,
    Date,
    Enum,
}

impl FieldKind {
    fn label(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::Integer => "integer",
            FieldKind::Date => "date (ISO 8601 string)",
            FieldKind::Enum => "enum",
        }
    }
}

/// One field of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
    #[serde(skip_serializing_if = "no_values")]
    pub values: &'static [&'static str],
    pub description: &'static str,
}

fn no_values(values: &&'static [&'static str]) -> bool {
    values.is_empty()
}

/// One collection and its fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CollectionSchema {
    pub collection: Collection,
    pub description: &'static str,
    pub tenant_scoped: bool,
    pub fields: &'static [FieldDescriptor],
}

/// Spending category of a bank transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionCategory {
    Food,
    Travel,
    Shopping,
    Bills,
    Other,
}

impl TransactionCategory {
    pub const ALL: [TransactionCategory; 5] = [
        TransactionCategory::Food,
        TransactionCategory::Travel,
        TransactionCategory::Shopping,
        TransactionCategory::Bills,
        TransactionCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionCategory::Food => "food",
            TransactionCategory::Travel => "travel",
            TransactionCategory::Shopping => "shopping",
            TransactionCategory::Bills => "bills",
            TransactionCategory::Other => "other",
        }
    }
}

const CATEGORY_VALUES: &[&str] = &["food", "travel", "shopping", "bills", "other"];

const fn field(name: &'static str, kind: FieldKind, description: &'static str) -> FieldDescriptor {
    FieldDescriptor {
        name,
        kind,
        values: &[],
        description,
    }
}

const TENANT: FieldDescriptor = field(
    TENANT_FIELD,
    FieldKind::String,
    "Owning tenant (matches users.id)",
);

const USERS_FIELDS: &[FieldDescriptor] = &[
    field("id", FieldKind::String, "Tenant identifier"),
    field("name", FieldKind::String, "Display name"),
];

const BANK_TRANSACTION_FIELDS: &[FieldDescriptor] = &[
    field("id", FieldKind::String, "Transaction identifier"),
    TENANT,
    field("amount", FieldKind::Number, "Transaction amount"),
    FieldDescriptor {
        name: "category",
        kind: FieldKind::Enum,
        values: CATEGORY_VALUES,
        description: "Spending category",
    },
    field("merchant", FieldKind::String, "Merchant name"),
    field("date", FieldKind::Date, "Transaction date"),
];

const MUTUAL_FUND_FIELDS: &[FieldDescriptor] = &[
    field("id", FieldKind::String, "Holding identifier"),
    TENANT,
    field("schemeName", FieldKind::String, "Mutual fund scheme name"),
    field("investedValue", FieldKind::Number, "Amount originally invested"),
    field("currentValue", FieldKind::Number, "Current market value"),
];

const EQUITY_FIELDS: &[FieldDescriptor] = &[
    field("id", FieldKind::String, "Holding identifier"),
    TENANT,
    field("stockName", FieldKind::String, "Stock name"),
    field("quantity", FieldKind::Integer, "Number of shares held"),
    field("currentPrice", FieldKind::Number, "Current price per share"),
];

const COLLECTIONS: &[CollectionSchema] = &[
    CollectionSchema {
        collection: Collection::Users,
        description: "Registered users; each user is a tenant",
        tenant_scoped: false,
        fields: USERS_FIELDS,
    },
    CollectionSchema {
        collection: Collection::BankTransactions,
        description: "Bank account transactions",
        tenant_scoped: true,
        fields: BANK_TRANSACTION_FIELDS,
    },
    CollectionSchema {
        collection: Collection::MutualFundHoldings,
        description: "Mutual fund holdings",
        tenant_scoped: true,
        fields: MUTUAL_FUND_FIELDS,
    },
    CollectionSchema {
        collection: Collection::EquityHoldings,
        description: "Equity (stock) holdings. Current value is quantity * currentPrice and is not stored",
        tenant_scoped: true,
        fields: EQUITY_FIELDS,
    },
];

/// All collection schemas, in allow-list order.
pub fn collections() -> &'static [CollectionSchema] {
    COLLECTIONS
}

/// Schema of a single collection.
pub fn collection(collection: Collection) -> &'static CollectionSchema {
    // COLLECTIONS is indexed in Collection::ALL order.
    match collection {
        Collection::Users => &COLLECTIONS[0],
        Collection::BankTransactions => &COLLECTIONS[1],
        Collection::MutualFundHoldings => &COLLECTIONS[2],
        Collection::EquityHoldings => &COLLECTIONS[3],
    }
}

/// Render the schema as prompt text for the translation collaborator.
pub fn describe() -> String {
    let mut out = String::from("Collections:\n");
    for schema in COLLECTIONS {
        out.push_str(&format!(
            "\n{} - {}{}\n",
            schema.collection,
            schema.description,
            if schema.tenant_scoped {
                " (scoped by tenantId)"
            } else {
                ""
            }
        ));
        for f in schema.fields {
            out.push_str(&format!("  - {}: {}", f.name, f.kind.label()));
            if !f.values.is_empty() {
                out.push_str(&format!(" [{}]", f.values.join(", ")));
            }
            out.push_str(&format!(" - {}\n", f.description));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_lookup_matches_table() {
        for c in Collection::ALL {
            assert_eq!(collection(c).collection, c);
            assert_eq!(collection(c).tenant_scoped, c.is_tenant_scoped());
        }
    }

    #[test]
    fn test_tenant_scoped_collections_declare_tenant_field() {
        for schema in collections().iter().filter(|s| s.tenant_scoped) {
            assert!(
                schema.fields.iter().any(|f| f.name == TENANT_FIELD),
                "{} lacks {}",
                schema.collection,
                TENANT_FIELD
            );
        }
    }

    #[test]
    fn test_describe_mentions_every_collection_and_category() {
        let text = describe();
        for c in Collection::ALL {
            assert!(text.contains(c.as_str()));
        }
        for category in TransactionCategory::ALL {
            assert!(text.contains(category.as_str()));
        }
        assert!(text.contains("quantity * currentPrice"));
    }
}
