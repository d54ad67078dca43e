//! Procedural derive macros for panocrop.
//!
//! Currently this crate only provides `#[derive(ConfigValidator)]`, which generates
//! field validation for the configuration structs in `panocrop-core`.

use darling::{FromDeriveInput, FromField, FromMeta, ast};
use proc_macro::TokenStream;
use quote::quote;
use syn::{DeriveInput, Expr, Type, parse_macro_input};

/// Bounds for `range(min = .., max = ..)` and `optional_range(min = .., max = ..)`.
#[derive(Debug, FromMeta)]
struct Bounds {
    min: Expr,
    max: Expr,
}

/// Validators accepted inside `#[validate(...)]`.
#[derive(Debug, Default, FromMeta)]
struct FieldRules {
    #[darling(default)]
    range: Option<Bounds>,

    #[darling(default)]
    min: Option<Expr>,

    #[darling(default)]
    max: Option<Expr>,

    #[darling(default)]
    optional_range: Option<Bounds>,

    /// Path must point to an existing file.
    #[darling(default)]
    path: bool,

    /// Like `path`, for `Option<PathBuf>`.
    #[darling(default)]
    optional_path: bool,

    /// Directory variant of `optional_path`.
    #[darling(default)]
    optional_dir: bool,

    /// Collections and strings must not be empty.
    #[darling(default)]
    non_empty: bool,
}

#[derive(Debug, FromField)]
#[darling(attributes(validate))]
struct RuleField {
    ident: Option<syn::Ident>,
    #[allow(dead_code)]
    ty: Type,
    #[darling(flatten)]
    rules: FieldRules,
}

#[derive(Debug, FromDeriveInput)]
#[darling(attributes(validate), supports(struct_named))]
struct ValidatedStruct {
    ident: syn::Ident,
    data: ast::Data<(), RuleField>,
}

/// Derives `ConfigValidator` for a named-field config struct.
///
/// Supported field rules:
///
/// - `#[validate(range(min = a, max = b))]`: value within `[a, b]`
/// - `#[validate(min = a)]` / `#[validate(max = b)]`
/// - `#[validate(optional_range(min = a, max = b))]`: same as `range` for `Option<T>`
/// - `#[validate(path)]` / `#[validate(optional_path)]`: file must exist
/// - `#[validate(optional_dir)]`: directory must exist
/// - `#[validate(non_empty)]`: `is_empty()` must be false
///
/// `get_defaults` is generated from `Default`, so the struct must implement it.
///
/// ```rust,ignore
/// use panocrop_core::ConfigValidator;
///
/// #[derive(ConfigValidator, Default)]
/// pub struct ScoringConfig {
///     #[validate(range(min = 0.0, max = 1.0))]
///     pub edge_band_fraction: f32,
///
///     #[validate(min = 1)]
///     pub caption_concepts: usize,
/// }
/// ```
#[proc_macro_derive(ConfigValidator, attributes(validate))]
pub fn derive_config_validator(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    ValidatedStruct::from_derive_input(&input)
        .and_then(|parsed| expand_config_validator(&parsed))
        .unwrap_or_else(|err| err.write_errors())
        .into()
}

fn expand_config_validator(input: &ValidatedStruct) -> darling::Result<proc_macro2::TokenStream> {
    let name = &input.ident;

    let fields = input
        .data
        .as_ref()
        .take_struct()
        .ok_or_else(|| darling::Error::unsupported_shape("enum"))?;

    let checks = fields.iter().filter_map(|field| expand_field_checks(field));

    Ok(quote! {
        impl crate::core::config::ConfigValidator for #name {
            fn validate(&self) -> Result<(), crate::core::config::ConfigError> {
                #(#checks)*
                Ok(())
            }

            fn get_defaults() -> Self
            where
                Self: Sized,
            {
                Self::default()
            }
        }
    })
}

fn expand_field_checks(field: &RuleField) -> Option<proc_macro2::TokenStream> {
    let ident = field.ident.as_ref()?;
    let label = ident.to_string();
    let rules = &field.rules;

    let mut checks = Vec::new();

    if let Some(Bounds { min, max }) = &rules.range {
        checks.push(quote! {
            if !(#min..=#max).contains(&self.#ident) {
                return Err(crate::core::config::ConfigError::InvalidConfig {
                    message: format!("{} must be between {} and {}, got {}", #label, #min, #max, self.#ident),
                });
            }
        });
    }

    if let Some(min) = &rules.min {
        checks.push(quote! {
            if self.#ident < #min {
                return Err(crate::core::config::ConfigError::InvalidConfig {
                    message: format!("{} must be at least {}", #label, #min),
                });
            }
        });
    }

    if let Some(max) = &rules.max {
        checks.push(quote! {
            if self.#ident > #max {
                return Err(crate::core::config::ConfigError::InvalidConfig {
                    message: format!("{} must be at most {}", #label, #max),
                });
            }
        });
    }

    if let Some(Bounds { min, max }) = &rules.optional_range {
        checks.push(quote! {
            if let Some(value) = self.#ident {
                if !(#min..=#max).contains(&value) {
                    return Err(crate::core::config::ConfigError::InvalidConfig {
                        message: format!("{} must be between {} and {}, got {}", #label, #min, #max, value),
                    });
                }
            }
        });
    }

    if rules.path {
        checks.push(quote! {
            self.validate_model_path(&self.#ident)?;
        });
    }

    if rules.optional_path {
        checks.push(quote! {
            if let Some(ref path) = self.#ident {
                self.validate_model_path(path)?;
            }
        });
    }

    if rules.optional_dir {
        checks.push(quote! {
            if let Some(ref dir) = self.#ident {
                self.validate_model_dir(dir)?;
            }
        });
    }

    if rules.non_empty {
        checks.push(quote! {
            if self.#ident.is_empty() {
                return Err(crate::core::config::ConfigError::InvalidConfig {
                    message: format!("{} must not be empty", #label),
                });
            }
        });
    }

    if checks.is_empty() {
        None
    } else {
        Some(quote! { #(#checks)* })
    }
}
