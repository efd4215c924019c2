pub mod field_as_string;
pub mod option_field_as_string;
