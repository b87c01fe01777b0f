//! Export normalizer
//!
//! Rewrites module export syntax into bare declarations so the entry
//! component is reachable as a plain identifier in a script without a
//! module system. This is pattern rewriting, not parsing: exports inside
//! strings or comments are rewritten too, and the output is never checked
//! for validity. Broken output shows up later as a render error.
//!
//! Rules, in order:
//! 1. trailing `export default <ident>;` becomes `const AppComponent = <ident>;`
//! 2. every `export default function <ident>` becomes `function <ident>`
//! 3. the first remaining `export default` becomes `const AppComponent = `
//! 4. `export` before `const`/`let`/`var`/`function`/`class` is dropped

use once_cell::sync::Lazy;
use regex::Regex;

/// Binding the driver script looks up first
pub const ENTRY_BINDING: &str = "AppComponent";
/// Binding used when `AppComponent` is absent
pub const FALLBACK_BINDING: &str = "App";

static TRAILING_DEFAULT_IDENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"export\s+default\s+([A-Za-z_$][A-Za-z0-9_$]*)\s*;\s*\z").expect("valid regex")
});

static DEFAULT_FUNCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"export\s+default\s+function\s+([A-Za-z_$][A-Za-z0-9_$]*)").expect("valid regex")
});

static NAMED_EXPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bexport\s+(const|let|var|function|class)\b").expect("valid regex"));

static IMPORT_STATEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*import\s+(?:[^;'"]*?\s*from\s*)?['"][^'"\n]+['"][ \t]*;?[ \t]*\r?\n?"#)
        .expect("valid regex")
});

static ENTRY_DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:\b(?:function\*?|class)\s+(AppComponent|App)\b)|(?:\b(?:const|let|var)\s+(AppComponent|App)\s*=)",
    )
    .expect("valid regex")
});

/// Apply the four export rules to `source`
#[must_use]
pub fn normalize_exports(source: &str) -> String {
    let text = TRAILING_DEFAULT_IDENT.replace(source, "const AppComponent = ${1};");
    let text = DEFAULT_FUNCTION.replace_all(&text, "function ${1}");

    let text = if text.contains("export default") {
        text.replacen("export default", "const AppComponent = ", 1)
    } else {
        text.into_owned()
    };

    NAMED_EXPORT.replace_all(&text, "${1}").into_owned()
}

/// Remove whole-line ES import statements
#[must_use]
pub fn strip_imports(source: &str) -> String {
    IMPORT_STATEMENT.replace_all(source, "").into_owned()
}

/// Normalize with the optional import stripping pass in front
#[must_use]
pub fn normalize_source(source: &str, strip: bool) -> String {
    if strip {
        normalize_exports(&strip_imports(source))
    } else {
        normalize_exports(source)
    }
}

/// Which identifier the driver will render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryBinding {
    AppComponent,
    App,
}

impl EntryBinding {
    #[must_use]
    pub fn identifier(self) -> &'static str {
        match self {
            EntryBinding::AppComponent => ENTRY_BINDING,
            EntryBinding::App => FALLBACK_BINDING,
        }
    }
}

/// Resolve the entry binding declared by normalized source
///
/// `AppComponent` wins over `App`; `None` means neither is declared.
#[must_use]
pub fn resolve_entry(normalized: &str) -> Option<EntryBinding> {
    let mut found_app = false;
    for caps in ENTRY_DECLARATION.captures_iter(normalized) {
        let name = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str());
        match name {
            Some(ENTRY_BINDING) => return Some(EntryBinding::AppComponent),
            Some(FALLBACK_BINDING) => found_app = true,
            _ => {}
        }
    }
    found_app.then_some(EntryBinding::App)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn trailing_default_identifier_becomes_binding() {
        let out = normalize_exports("function App(){return 1}\nexport default App;");
        assert_eq!(out, "function App(){return 1}\nconst AppComponent = App;");
        assert_eq!(resolve_entry(&out), Some(EntryBinding::AppComponent));
    }

    #[test]
    fn trailing_whitespace_after_default_is_accepted() {
        let out = normalize_exports("const App = () => null;\nexport default App;  \n\n");
        assert!(out.ends_with("const AppComponent = App;"));
    }

    #[test]
    fn default_function_loses_export() {
        let out = normalize_exports("export default function App() { return null; }");
        assert_eq!(out, "function App() { return null; }");
        assert!(!out.contains("export"));
        assert_eq!(resolve_entry(&out), Some(EntryBinding::App));
    }

    #[test]
    fn every_default_function_is_rewritten() {
        let out = normalize_exports("export default function A() {}\nexport default function B() {}");
        assert_eq!(out, "function A() {}\nfunction B() {}");
    }

    #[test]
    fn named_exports_and_trailing_default() {
        let out = normalize_exports("export const helper = 1; export default App;");
        assert_eq!(out, "const helper = 1; const AppComponent = App;");
        assert!(!out.contains("export"));
    }

    #[test]
    fn only_first_anonymous_default_is_rewritten() {
        let out = normalize_exports("export default () => 1;\nexport default 2;");
        assert_eq!(out, "const AppComponent =  () => 1;\nexport default 2;");
    }

    #[test]
    fn default_class_expression_becomes_binding() {
        let out = normalize_exports("export default class Widget {}");
        assert!(out.starts_with("const AppComponent = "));
        assert_eq!(resolve_entry(&out), Some(EntryBinding::AppComponent));
    }

    #[test]
    fn every_named_declaration_kind_is_stripped() {
        let src = "export const a = 1;\nexport let b;\nexport var c;\nexport function d() {}\nexport class E {}";
        assert_eq!(
            normalize_exports(src),
            "const a = 1;\nlet b;\nvar c;\nfunction d() {}\nclass E {}"
        );
    }

    #[test]
    fn export_lists_are_left_alone() {
        assert_eq!(normalize_exports("export { a, b };"), "export { a, b };");
    }

    #[test]
    fn source_without_exports_is_unchanged() {
        let src = "function App() { return <div/>; }";
        assert_eq!(normalize_exports(src), src);
    }

    #[test]
    fn strip_imports_removes_static_imports_only() {
        let src = "import React from 'react';\nimport './index.css';\nimport {\n  a,\n  b\n} from \"./x\";\nconst lazy = import('./y');\nfunction App() {}\n";
        assert_eq!(strip_imports(src), "const lazy = import('./y');\nfunction App() {}\n");
    }

    #[test]
    fn normalize_source_honours_strip_flag() {
        let src = "import React from 'react';\nexport default function App() {}";
        assert_eq!(normalize_source(src, true), "function App() {}");
        assert!(normalize_source(src, false).starts_with("import React"));
    }

    #[test]
    fn resolution_ignores_lookalike_names() {
        assert_eq!(resolve_entry("function Apple() {}\nconst AppShell = 1;"), None);
        assert_eq!(resolve_entry("let App = () => null;"), Some(EntryBinding::App));
        assert_eq!(
            resolve_entry("function App() {}\nconst AppComponent = App;"),
            Some(EntryBinding::AppComponent)
        );
    }
}
