// Table registry
// Statically declared application tables and the two drivers that select from them

#[cfg(test)]
mod tests;

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::TableConfig;

/// A column as declared by the application schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub data_type: &'static str,
}

/// A table as declared by the application schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogTable {
    pub name: &'static str,
    pub primary_key: Option<&'static str>,
    pub columns: &'static [ColumnSpec],
}

const fn col(name: &'static str, data_type: &'static str) -> ColumnSpec {
    ColumnSpec { name, data_type }
}

static CATALOG: &[CatalogTable] = &[
    CatalogTable {
        name: "products",
        primary_key: Some("id"),
        columns: &[
            col("id", "UUID"),
            col("name", "VARCHAR"),
            col("description", "TEXT"),
            col("price", "NUMERIC(10, 2)"),
            col("sale_price", "NUMERIC(10, 2)"),
            col("category", "VARCHAR"),
            col("subcategory", "VARCHAR"),
            col("material", "VARCHAR"),
            col("weight", "NUMERIC(10, 2)"),
            col("dimensions", "VARCHAR"),
            col("stock_quantity", "INTEGER"),
            col("is_featured", "BOOLEAN"),
            col("is_new", "BOOLEAN"),
            col("is_on_sale", "BOOLEAN"),
            col("created_at", "DATETIME"),
            col("updated_at", "DATETIME"),
            col("shop_id", "UUID"),
            col("metadata", "JSON"),
        ],
    },
    CatalogTable {
        name: "shops",
        primary_key: Some("id"),
        columns: &[
            col("id", "UUID"),
            col("owner_id", "UUID"),
            col("name", "VARCHAR"),
            col("description", "TEXT"),
            col("logo_url", "VARCHAR"),
            col("banner_url", "VARCHAR"),
            col("contact_email", "VARCHAR"),
            col("contact_phone", "VARCHAR"),
            col("address", "JSON"),
            col("business_hours", "JSON"),
            col("social_media", "JSON"),
            col("is_verified", "BOOLEAN"),
            col("created_at", "DATETIME"),
            col("updated_at", "DATETIME"),
        ],
    },
    CatalogTable {
        name: "product_images",
        primary_key: Some("id"),
        columns: &[
            col("id", "UUID"),
            col("product_id", "UUID"),
            col("image_url", "VARCHAR"),
            col("alt_text", "VARCHAR"),
            col("is_primary", "BOOLEAN"),
            col("display_order", "INTEGER"),
            col("created_at", "DATETIME"),
        ],
    },
    CatalogTable {
        name: "product_tryon_images",
        primary_key: Some("id"),
        columns: &[
            col("id", "UUID"),
            col("product_id", "UUID"),
            col("user_id", "UUID"),
            col("image_url", "VARCHAR"),
            col("thumbnail_url", "VARCHAR"),
            col("is_favorite", "BOOLEAN"),
            col("created_at", "DATETIME"),
            col("updated_at", "DATETIME"),
            col("metadata", "JSON"),
        ],
    },
    CatalogTable {
        name: "users",
        primary_key: Some("id"),
        columns: &[
            col("id", "UUID"),
            col("email", "VARCHAR"),
            col("name", "VARCHAR"),
            col("avatar_url", "VARCHAR"),
            col("created_at", "DATETIME"),
            col("updated_at", "DATETIME"),
            col("last_login", "DATETIME"),
            col("role", "VARCHAR"),
            col("preferences", "JSON"),
        ],
    },
    CatalogTable {
        name: "user_settings",
        primary_key: Some("id"),
        columns: &[
            col("id", "UUID"),
            col("user_id", "UUID"),
            col("language", "VARCHAR"),
            col("theme", "VARCHAR"),
            col("notifications_enabled", "BOOLEAN"),
            col("email_notifications", "JSON"),
            col("created_at", "TIMESTAMP"),
            col("updated_at", "TIMESTAMP"),
        ],
    },
    CatalogTable {
        name: "tickets",
        primary_key: Some("id"),
        columns: &[
            col("id", "UUID"),
            col("user_id", "UUID"),
            col("subject", "TEXT"),
            col("description", "TEXT"),
            col("status", "VARCHAR"),
            col("priority", "VARCHAR"),
            col("category", "VARCHAR"),
            col("assigned_to", "UUID"),
            col("related_order_id", "UUID"),
            col("related_product_id", "UUID"),
            col("attachments", "JSON"),
            col("created_at", "DATETIME"),
            col("updated_at", "DATETIME"),
            col("resolved_at", "DATETIME"),
        ],
    },
    CatalogTable {
        name: "ticket_responses",
        primary_key: Some("id"),
        columns: &[
            col("id", "UUID"),
            col("ticket_id", "UUID"),
            col("user_id", "UUID"),
            col("is_staff", "BOOLEAN"),
            col("message", "TEXT"),
            col("attachments", "JSON"),
            col("created_at", "DATETIME"),
            col("updated_at", "DATETIME"),
        ],
    },
];

/// Tables the scheduled job is allowed to touch, with their embedded columns
pub const SCHEDULED_TABLES: &[(&str, &[&str])] = &[
    (
        "products",
        &["name", "description", "category", "subcategory", "material"],
    ),
    ("shops", &["name", "description", "category", "address"]),
];

/// The application tables known at build time
#[inline]
pub fn catalog() -> &'static [CatalogTable] {
    CATALOG
}

#[inline]
pub fn catalog_table(name: &str) -> Option<&'static CatalogTable> {
    CATALOG.iter().find(|table| table.name == name)
}

/// Whether a declared column type holds free text
#[inline]
pub fn is_text_type(data_type: &str) -> bool {
    let lowered = data_type.to_ascii_lowercase();
    ["varchar", "text", "char", "string"]
        .iter()
        .any(|marker| lowered.contains(marker))
}

/// Text-like columns of `table` in declaration order, `None` when there are none
#[inline]
pub fn text_fields_for(table: &CatalogTable) -> Option<Vec<String>> {
    let fields: Vec<String> = table
        .columns
        .iter()
        .filter(|column| is_text_type(column.data_type))
        .map(|column| column.name.to_string())
        .collect();

    (!fields.is_empty()).then_some(fields)
}

/// One table selected for syncing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    pub name: String,
    pub primary_key: Option<String>,
    /// Embedded columns; `None` means every non-null column
    pub text_fields: Option<Vec<String>>,
}

impl TableSpec {
    #[inline]
    pub fn text_field_set(&self) -> Option<HashSet<String>> {
        self.text_fields
            .as_ref()
            .map(|fields| fields.iter().cloned().collect())
    }
}

/// Which call site is running the sync. Both feed the same runner.
///
/// The drivers pick embedded columns differently, so a shared table can embed
/// different text depending on which driver last recreated its collection. For
/// `products` the column-type rule also embeds `dimensions`, which the scheduled
/// map leaves out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    /// Long-running process: every known table, text fields from column types
    #[default]
    Process,
    /// Scheduled job: fixed allowlist, text fields from a static map
    Scheduled,
}

impl fmt::Display for Driver {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Process => write!(f, "process"),
            Self::Scheduled => write!(f, "scheduled"),
        }
    }
}

impl FromStr for Driver {
    type Err = String;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "process" => Ok(Self::Process),
            "scheduled" => Ok(Self::Scheduled),
            other => Err(format!(
                "unknown driver '{}' (expected 'process' or 'scheduled')",
                other
            )),
        }
    }
}

impl Driver {
    /// Tables this driver syncs, in processing order
    #[inline]
    pub fn tables(self, extra: &[TableConfig]) -> Vec<TableSpec> {
        match self {
            Self::Process => process_tables(extra),
            Self::Scheduled => scheduled_tables(),
        }
    }
}

fn process_tables(extra: &[TableConfig]) -> Vec<TableSpec> {
    let declared = CATALOG.iter().map(|table| TableSpec {
        name: table.name.to_string(),
        primary_key: table.primary_key.map(str::to_string),
        text_fields: text_fields_for(table),
    });

    let configured = extra.iter().map(|table| TableSpec {
        name: table.name.clone(),
        primary_key: table.primary_key.clone(),
        text_fields: (!table.text_fields.is_empty()).then(|| table.text_fields.clone()),
    });

    let mut seen = HashSet::new();
    declared
        .chain(configured)
        .filter(|spec| {
            if spec.primary_key.is_none() {
                warn!("Skipping table '{}': no primary key declared", spec.name);
                return false;
            }
            if !seen.insert(spec.name.clone()) {
                warn!("Skipping duplicate table '{}'", spec.name);
                return false;
            }
            true
        })
        .collect()
}

fn scheduled_tables() -> Vec<TableSpec> {
    SCHEDULED_TABLES
        .iter()
        .map(|(name, fields)| TableSpec {
            name: (*name).to_string(),
            primary_key: catalog_table(name).and_then(|table| table.primary_key.map(str::to_string)),
            text_fields: Some(fields.iter().map(|field| (*field).to_string()).collect()),
        })
        .collect()
}
