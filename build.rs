// build.rs

//! Compiles `locales/*.toml` into the `t!` macro included by `src/lib.rs`.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;

type Catalogue = BTreeMap<String, String>;

const BASE_LANG: &str = "en";

fn main() {
    println!("cargo:rerun-if-env-changed=RUNR_LANG");
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=locales/");

    let lang = selected_lang();
    let mut catalogue = load(BASE_LANG).expect("locales/en.toml is required");
    if lang != BASE_LANG {
        match load(&lang) {
            Some(overrides) => catalogue.extend(overrides),
            None => println!("cargo:warning=No catalogue for '{lang}', using '{BASE_LANG}'."),
        }
    }

    let out_dir = env::var("OUT_DIR").expect("cargo sets OUT_DIR");
    fs::write(Path::new(&out_dir).join("translations.rs"), render(&catalogue))
        .expect("could not write translations.rs");
}

/// A `lang_*` feature wins over `RUNR_LANG`.
fn selected_lang() -> String {
    let mut features: Vec<String> = env::vars()
        .filter_map(|(key, _)| key.strip_prefix("CARGO_FEATURE_LANG_").map(str::to_lowercase))
        .collect();
    features.sort();

    match features.as_slice() {
        [] => env::var("RUNR_LANG").unwrap_or_else(|_| BASE_LANG.to_string()),
        [only] => only.clone(),
        [first, ..] => {
            println!("cargo:warning=Several lang_* features enabled, using '{first}'.");
            first.clone()
        }
    }
}

fn load(lang: &str) -> Option<Catalogue> {
    let path = format!("locales/{lang}.toml");
    let content = fs::read_to_string(&path).ok()?;
    Some(toml::from_str(&content).unwrap_or_else(|e| panic!("{path}: {e}")))
}

/// Each key expands to a string literal so `t!` works as a `format!` template. Unknown
/// keys are a compile error.
fn render(catalogue: &Catalogue) -> String {
    let arms: String = catalogue
        .iter()
        .map(|(key, value)| format!("    ({key:?}) => {{ {value:?} }};\n"))
        .collect();
    format!(
        "/// Looks up a user-facing message in the compiled message catalogue.\n\
         #[macro_export]\n\
         macro_rules! t {{\n{arms}    ($key:expr) => {{ compile_error!(concat!(\"Missing translation key: \", $key)) }};\n}}\n"
    )
}
