//! User record shape.

use crate::schema::{FieldDef, RecordShape};

/// Username plus two optional fields defaulting to null.
pub fn user() -> RecordShape {
    RecordShape::new("user")
        .with_description("User with optional email and age")
        .field(FieldDef::string("username"))
        .field(FieldDef::string("email").optional())
        .field(FieldDef::int("age").optional())
}
