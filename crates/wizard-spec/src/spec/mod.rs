pub mod field;
pub mod form;
pub mod wizard;

pub use field::{FieldConfig, FieldOption, FieldType};
pub use form::{FormConfig, FormPersistenceConfig, FormSection};
pub use wizard::{
    ConfigError, NavigationMode, PersistenceConfig, StepId, StorageType, SubmitConfig, SubmitMethod,
    WizardConfig, WizardStep,
};
