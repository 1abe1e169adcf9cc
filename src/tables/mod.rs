pub mod loans;
pub mod reader;

pub use loans::{LoanRecord, LoanTable};
pub use reader::{is_valid_account_name, BoundedRangeTableReader};
