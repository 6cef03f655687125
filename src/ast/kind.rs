use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Describes what an operation kind needs in order to be well formed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KindSpec {
    pub name: String,
    #[serde(default)]
    pub required_properties: Vec<String>,
    #[serde(default)]
    pub requires_input: bool,
    #[serde(default)]
    pub requires_output: bool,
}

impl KindSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required_properties: Vec::new(),
            requires_input: false,
            requires_output: false,
        }
    }

    pub fn with_required(mut self, properties: &[&str]) -> Self {
        self.required_properties = properties.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn with_input(mut self) -> Self {
        self.requires_input = true;
        self
    }

    pub fn with_output(mut self) -> Self {
        self.requires_output = true;
        self
    }
}

/// Defines the built-in operation kinds, their lookup by name, and their requirement table.
macro_rules! define_operation_kinds {
    ( $( $variant:ident { required: [$($req:literal),*], input: $input:literal, output: $output:literal, doc: $doc:literal } ),* $(,)? ) => {
        /// The type tag of an operation. Unknown names are carried as `Custom`
        /// and must be registered in a [`KindRegistry`] to validate.
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum OperationKind {
            $( #[doc = $doc] $variant, )*
            Custom(String),
        }

        impl OperationKind {
            pub const BUILTIN: &'static [&'static str] = &[$(stringify!($variant)),*];

            pub fn from_name(name: &str) -> Self {
                match name {
                    $( stringify!($variant) => OperationKind::$variant, )*
                    other => OperationKind::Custom(other.to_string()),
                }
            }

            pub fn name(&self) -> &str {
                match self {
                    $( OperationKind::$variant => stringify!($variant), )*
                    OperationKind::Custom(name) => name,
                }
            }
        }

        fn builtin_specs() -> Vec<KindSpec> {
            vec![
                $(
                    KindSpec {
                        name: stringify!($variant).to_string(),
                        required_properties: vec![$($req.to_string()),*],
                        requires_input: $input,
                        requires_output: $output,
                    },
                )*
            ]
        }
    };
}

define_operation_kinds! {
    ApiCall { required: ["method", "url"], input: false, output: true, doc: "HTTP request to an external API." },
    FilterData { required: [], input: true, output: true, doc: "Keeps items matching every `where` condition." },
    TransformData { required: ["transform"], input: true, output: true, doc: "Reshapes data with a named transform." },
    Conditional { required: [], input: false, output: false, doc: "Branches on an `if` condition." },
    Loop { required: [], input: true, output: false, doc: "Runs its body once per input array element." },
    StoreData { required: ["storage", "key"], input: true, output: false, doc: "Persists data to a storage backend." },
    Wait { required: ["duration"], input: false, output: false, doc: "Pauses execution for a duration in milliseconds." },
    MergeData { required: ["sources", "strategy"], input: false, output: true, doc: "Combines several sources with a strategy." },
    GetCurrentDateTime { required: [], input: false, output: true, doc: "Reads the current date and time." },
    ConvertTimezone { required: ["toTimezone"], input: true, output: true, doc: "Converts a timestamp between timezones." },
    DateCalculation { required: ["operation"], input: true, output: true, doc: "Adds or subtracts time from a date." },
    FormatText { required: ["format"], input: true, output: true, doc: "Formats text with a template." },
    ExtractText { required: ["pattern"], input: true, output: true, doc: "Extracts text matching a pattern." },
    ValidateData { required: ["validationType"], input: true, output: true, doc: "Checks data against a validation type." },
    Calculate { required: ["operation"], input: true, output: true, doc: "Arithmetic over input values." },
    EncodeDecode { required: ["operation", "encoding"], input: true, output: true, doc: "Encodes or decodes data." },
}

impl OperationKind {
    pub fn is_builtin(&self) -> bool {
        !matches!(self, OperationKind::Custom(_))
    }

    /// Kinds whose real execution has an external side effect.
    pub fn is_effect(&self) -> bool {
        matches!(
            self,
            OperationKind::ApiCall | OperationKind::StoreData | OperationKind::Wait
        )
    }
}

impl From<String> for OperationKind {
    fn from(name: String) -> Self {
        OperationKind::from_name(&name)
    }
}

impl From<OperationKind> for String {
    fn from(kind: OperationKind) -> Self {
        kind.name().to_string()
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The set of kinds a validator accepts, keyed by kind name.
#[derive(Debug, Clone)]
pub struct KindRegistry {
    specs: AHashMap<String, KindSpec>,
}

impl KindRegistry {
    /// A registry holding the 16 built-in kinds.
    pub fn builtin() -> Self {
        let specs = builtin_specs()
            .into_iter()
            .map(|spec| (spec.name.clone(), spec))
            .collect();
        Self { specs }
    }

    /// Registers a plugin kind, replacing any previous spec with the same name.
    pub fn register(&mut self, spec: KindSpec) -> Option<KindSpec> {
        self.specs.insert(spec.name.clone(), spec)
    }

    pub fn get(&self, name: &str) -> Option<&KindSpec> {
        self.specs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.specs.contains_key(name)
    }

    /// Kind names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.specs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for KindRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
