//! Response schemas inferred from endpoint templates.
//!
//! The resource is the last static segment of the template, singularized
//! (`/api/todos/{id}/` -> `todo`). Its fields come from the configured
//! resources, else from a built-in table, and each field's type is derived
//! from its name. Generated values depend only on the resource, the field and
//! the item number, so repeated runs produce identical fixtures.

use ef_core::naming::{singularize, WireCase};
use heck::ToSnakeCase;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Resource name used when a template has no static segment
const FALLBACK_RESOURCE: &str = "item";

/// Fields of resources nothing else is known about
const DEFAULT_FIELDS: &[&str] = &["id", "name", "created_at", "updated_at"];

/// Built-in field table, keyed by singular snake-case resource name
const BUILTIN_RESOURCES: &[(&str, &[&str])] = &[
    ("user", &["id", "username", "email", "first_name", "last_name", "is_active", "date_joined"]),
    ("profile", &["id", "user_id", "display_name", "bio", "avatar_url", "updated_at"]),
    ("todo", &["id", "title", "completed", "created_at"]),
    ("task", &["id", "title", "description", "status", "due_date", "assignee_id"]),
    ("post", &["id", "title", "body", "author_id", "published", "created_at"]),
    ("comment", &["id", "post_id", "author_id", "body", "created_at"]),
    ("product", &["id", "name", "description", "price", "stock", "image_url"]),
    ("order", &["id", "status", "total", "item_count", "created_at"]),
    ("order_item", &["id", "order_id", "product_id", "quantity", "price"]),
    ("cart", &["id", "item_count", "total", "updated_at"]),
    ("category", &["id", "name", "slug"]),
    ("tag", &["id", "name", "slug"]),
    ("message", &["id", "sender_id", "text", "is_read", "created_at"]),
    ("notification", &["id", "title", "is_read", "created_at"]),
    ("project", &["id", "name", "description", "owner_id", "created_at"]),
    ("team", &["id", "name", "member_count"]),
    ("invoice", &["id", "number", "amount", "status", "issued_at"]),
    ("payment", &["id", "amount", "currency", "status", "created_at"]),
    ("file", &["id", "name", "size", "url", "uploaded_at"]),
    ("event", &["id", "title", "location", "starts_at", "ends_at"]),
    ("me", &["id", "username", "email", "first_name", "last_name"]),
    ("session", &["token", "expires_at", "user_id"]),
    ("login", &["token", "expires_at", "user_id"]),
    ("token", &["access", "refresh"]),
    ("setting", &["id", "key", "value"]),
];

/// Value type of a generated field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Id,
    Integer,
    Decimal,
    Boolean,
    DateTime,
    Date,
    Email,
    Url,
    Slug,
    Status,
    Currency,
    Text,
}

impl FieldType {
    /// Type implied by a snake-case field name
    pub fn infer(name: &str) -> Self {
        let last = name.rsplit('_').next().unwrap_or(name);
        match name {
            "id" | "pk" => return FieldType::Id,
            "status" | "state" => return FieldType::Status,
            "currency" => return FieldType::Currency,
            "slug" => return FieldType::Slug,
            "email" => return FieldType::Email,
            "completed" | "published" | "active" | "verified" | "archived" | "enabled" => {
                return FieldType::Boolean
            }
            _ => {}
        }
        if name.starts_with("is_") || name.starts_with("has_") || name.starts_with("can_") {
            return FieldType::Boolean;
        }
        match last {
            "id" => FieldType::Integer,
            "at" | "joined" => FieldType::DateTime,
            "date" | "birthday" => FieldType::Date,
            "email" => FieldType::Email,
            "url" | "link" | "href" | "avatar" | "image" => FieldType::Url,
            "price" | "amount" | "total" | "balance" | "cost" => FieldType::Decimal,
            "count" | "quantity" | "size" | "stock" | "age" | "number" | "position" | "rating" => {
                FieldType::Integer
            }
            _ => FieldType::Text,
        }
    }

    fn sample(&self, resource: &str, field: &str, n: usize) -> Value {
        match self {
            FieldType::Id => json!(n),
            FieldType::Integer => json!(n * 10),
            FieldType::Decimal => json!(format!("{}.99", n * 10)),
            FieldType::Boolean => json!(n % 2 == 1),
            FieldType::DateTime => json!(format!("2024-01-{:02}T12:00:00Z", (n - 1) % 28 + 1)),
            FieldType::Date => json!(format!("2024-01-{:02}", (n - 1) % 28 + 1)),
            FieldType::Email => json!(format!("{}{}@example.com", resource.replace('_', "."), n)),
            FieldType::Url => json!(format!("https://example.com/{}/{}", resource, n)),
            FieldType::Slug => json!(format!("{}-{}", resource.replace('_', "-"), n)),
            FieldType::Status => json!("active"),
            FieldType::Currency => json!("usd"),
            FieldType::Text => {
                let label = format!("{} {}", resource, field).replace('_', " ");
                let mut chars = label.chars();
                let capitalized: String = match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                };
                json!(format!("{} {}", capitalized, n))
            }
        }
    }
}

/// Fields of one resource, names in snake case
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSchema {
    pub resource: String,
    pub fields: Vec<(String, FieldType)>,
}

impl ResourceSchema {
    /// Schema for the resource behind `template`
    pub fn infer(template: &str, configured: &IndexMap<String, Vec<String>>) -> Self {
        let resource = resource_name(template);
        let names: Vec<String> = configured
            .iter()
            .find(|(name, _)| name.to_snake_case() == resource)
            .map(|(_, fields)| fields.clone())
            .or_else(|| {
                BUILTIN_RESOURCES
                    .iter()
                    .find(|(name, _)| *name == resource)
                    .map(|(_, fields)| fields.iter().map(|f| f.to_string()).collect())
            })
            .unwrap_or_else(|| DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect());

        let fields = names
            .iter()
            .map(|name| {
                let snake = name.to_snake_case();
                let kind = FieldType::infer(&snake);
                (snake, kind)
            })
            .collect();
        Self { resource, fields }
    }

    /// Item number `n` (1-based), field names in the wire convention
    pub fn instance(&self, n: usize, wire: WireCase) -> Value {
        let mut object = Map::new();
        for (name, kind) in &self.fields {
            object.insert(wire.apply(name), kind.sample(&self.resource, name, n));
        }
        Value::Object(object)
    }
}

/// Singular snake-case name of the last static segment
pub fn resource_name(template: &str) -> String {
    template
        .split('/')
        .rev()
        .find(|segment| !segment.is_empty() && !segment.contains('{'))
        .map(|segment| {
            let snake = segment.to_snake_case();
            match snake.rsplit_once('_') {
                Some((head, last)) => format!("{}_{}", head, singularize(last)),
                None => singularize(&snake),
            }
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| FALLBACK_RESOURCE.to_string())
}

/// Whether a template addresses a collection rather than one item
pub fn is_collection(template: &str) -> bool {
    template
        .split('/')
        .rev()
        .find(|segment| !segment.is_empty())
        .map(|segment| !segment.starts_with('{'))
        .unwrap_or(true)
}
