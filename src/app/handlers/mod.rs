pub mod feature;
pub mod section;
pub mod verifier;

pub use feature::{MainCompanyFeatureHandler, PlatformProfileFeatureHandler};
pub use section::{DeclarationSectionHandler, LogisticsSectionHandler};
pub use verifier::{CompanyAccessVerifier, PageSizeVerifier};
