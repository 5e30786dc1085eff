pub mod compiler;
pub mod matcher;
pub mod schema;
pub mod validator;

pub use schema::{SchemaValidator, check_schema};
pub use validator::{
    HeaderExpectation, HeaderValidator, JsonValidator, StatusExpectation, StatusValidator,
    Validator,
};
