// Data models for the gateway surface and the Power BI wire format

pub mod envelope;
pub mod payloads;
pub mod powerbi;

pub use envelope::Envelope;
