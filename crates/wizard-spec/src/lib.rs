#![allow(missing_docs)]

pub mod debounce;
pub mod form_persistence;
pub mod form_validate;
pub mod machine;
pub mod navigation;
pub mod persistence;
pub mod registry;
pub mod rules;
pub mod schema;
pub mod spec;
pub mod state;
pub mod submit;
pub mod template;
pub mod validator;
pub mod visibility;

pub use debounce::Debouncer;
pub use form_persistence::{DraftInfo, FormAutosave, FormStorage, MAX_DRAFT_AGE_DAYS};
pub use form_validate::{FormValidation, validate_form};
pub use machine::{WizardError, WizardMachine};
pub use navigation::{NavigationInfo, navigation, progress};
pub use persistence::{
    FileStore, KeyValueStore, MemoryStore, StorageBackends, StoreError, WizardPersistence,
};
pub use registry::{FieldKind, FieldRegistry, InputError};
pub use rules::{ConditionMode, ConditionalGroup, ConditionalRule, Operator, evaluate};
pub use schema::{
    Constraint, FieldRule, ObjectSchema, SchemaError, SchemaIssue, SchemaRegistry, StepSchema,
};
pub use spec::{
    ConfigError, FieldConfig, FieldOption, FieldType, FormConfig, FormPersistenceConfig,
    FormSection, NavigationMode, PersistenceConfig, StepId, StorageType, SubmitConfig,
    SubmitMethod, WizardConfig, WizardStep,
};
pub use state::{FieldErrors, StepStatus, WizardSnapshot, WizardState};
pub use submit::{SubmitError, SubmitOutcome, Submitter};
pub use template::MessageTemplates;
pub use validator::{FORM_ERROR_KEY, StepValidation, StepValidator, field_errors};
pub use visibility::{
    VisibilityMap, compute_visibility, hidden_fields, is_field_visible, resolve_form_visibility,
    visible_fields,
};
