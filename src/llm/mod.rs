pub mod chat;
pub mod ocr;
pub mod structured;
