// Certificates module - Leaf certificate retrieval and expiry classification

pub mod inspector;
pub mod parser;
pub mod verdict;

pub use inspector::CertificateInspector;
pub use parser::LeafCertificate;
pub use verdict::CertificateVerdict;
