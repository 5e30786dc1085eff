pub mod assertion;
pub mod document;
pub mod error;
pub mod pointer;
pub mod report;
pub mod response;
