//! Document synthesizer
//!
//! Assembles the self-contained markup document published into the
//! isolated render host. Layout is fixed and load-order significant:
//!
//! 1. `<head>`: reset rules, mount sizing, user stylesheet verbatim, then
//!    the error guard script (plain script, so it works even when the
//!    compiler rejects the user source)
//! 2. `<body>`: one empty mount element
//! 3. runtime, renderer and compiler scripts, synchronous, in that order
//! 4. one compiler-processed inline script: hook bindings, user source,
//!    then the driver that resolves and renders the entry component
//!
//! Synthesis never fails. Input validation happens in the controller.

use crate::config::PreviewConfig;
use crate::normalize::{ENTRY_BINDING, FALLBACK_BINDING};
use crate::types::{BuildInput, Generation};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write;

/// `postMessage` source tag used by every message the document sends
pub const MESSAGE_SOURCE: &str = "live-preview";

static CLOSING_STYLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</(style)").expect("valid regex"));
static CLOSING_SCRIPT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</(script)").expect("valid regex"));

const GUARD_SCRIPT: &str = r"(function () {
  var generation = __GENERATION__;
  var mountId = __MOUNT_ID__;
  var hints = [
    'Check that ' + __ENTRY_FILE__ + ' defines App or ends with an export default.',
    'Components must return markup, a string or null.',
    'Open the console of the preview frame for the full stack trace.'
  ];
  function notify(type, message) {
    try {
      window.parent.postMessage({ source: __SOURCE__, type: type, generation: generation, message: message }, '*');
    } catch (_) {}
  }
  window.__previewShowError = function (error) {
    var message = error && error.message ? error.message : String(error);
    notify('render-error', message);
    var container = document.getElementById(mountId);
    if (!container) { return; }
    container.textContent = '';
    var panel = document.createElement('div');
    panel.className = 'preview-error';
    var title = document.createElement('strong');
    title.textContent = 'Preview error';
    var body = document.createElement('pre');
    body.textContent = message;
    var list = document.createElement('ul');
    hints.forEach(function (hint) {
      var item = document.createElement('li');
      item.textContent = hint;
      list.appendChild(item);
    });
    panel.appendChild(title);
    panel.appendChild(body);
    panel.appendChild(list);
    container.appendChild(panel);
  };
  window.addEventListener('error', function (event) {
    window.__previewShowError(event.error || event.message);
  });
  window.addEventListener('load', function () { notify('loaded', null); });
})();";

const DRIVER_SCRIPT: &str = r"(function () {
  var container = document.getElementById(__MOUNT_ID__);
  var root = null;
  try {
    var Entry = typeof __ENTRY__ !== 'undefined' ? __ENTRY__
      : typeof __FALLBACK__ !== 'undefined' ? __FALLBACK__
      : null;
    if (Entry === null) {
      throw new Error('No entry component found. Define App or add an export default.');
    }
    if (typeof Entry !== 'function' && !(Entry && typeof Entry === 'object' && Entry.$$typeof)) {
      throw new Error('Entry component is not renderable (got ' + typeof Entry + ')');
    }
    class PreviewBoundary extends React.Component {
      constructor(props) {
        super(props);
        this.state = { failed: false };
      }
      static getDerivedStateFromError() {
        return { failed: true };
      }
      componentDidCatch(error) {
        setTimeout(function () {
          if (root !== null) { root.unmount(); }
          window.__previewShowError(error);
        }, 0);
      }
      render() {
        return this.state.failed ? null : this.props.children;
      }
    }
    root = ReactDOM.createRoot(container);
    root.render(React.createElement(PreviewBoundary, null, React.createElement(Entry)));
  } catch (error) {
    window.__previewShowError(error);
  }
})();";

/// Builds preview documents for one configuration
#[derive(Debug, Clone)]
pub struct DocumentSynthesizer {
    runtime_scripts: Vec<String>,
    hook_names: Vec<String>,
    mount_id: String,
    entry_file: String,
}

impl DocumentSynthesizer {
    #[must_use]
    pub fn new(config: &PreviewConfig) -> Self {
        Self {
            runtime_scripts: config.runtime_scripts.clone(),
            hook_names: config.hook_names.clone(),
            mount_id: config.mount_id.clone(),
            entry_file: config.entry_file.clone(),
        }
    }

    /// Full document text for `input`, tagged with `generation`
    #[must_use]
    pub fn synthesize(&self, generation: Generation, input: &BuildInput) -> String {
        let mut doc = String::with_capacity(
            input.normalized_source.len() + input.stylesheet_text.len() + 4096,
        );

        doc.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
        doc.push_str("<meta charset=\"UTF-8\">\n");
        doc.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
        let _ = writeln!(doc, "<meta name=\"preview-generation\" content=\"{}\">", generation.0);

        doc.push_str("<style>\n");
        doc.push_str(&self.base_styles());
        doc.push_str(&CLOSING_STYLE.replace_all(&input.stylesheet_text, "<\\/$1"));
        doc.push_str("\n</style>\n");

        doc.push_str("<script>\n");
        doc.push_str(&self.fill(GUARD_SCRIPT, generation));
        doc.push_str("\n</script>\n");
        doc.push_str("</head>\n<body>\n");

        let _ = writeln!(doc, "<div id=\"{}\"></div>", attribute_escape(&self.mount_id));

        for url in &self.runtime_scripts {
            let _ = writeln!(doc, "<script crossorigin src=\"{}\"></script>", attribute_escape(url));
        }

        doc.push_str("<script type=\"text/babel\">\n");
        if !self.hook_names.is_empty() {
            let _ = writeln!(doc, "const {{ {} }} = React;\n", self.hook_names.join(", "));
        }
        doc.push_str(&CLOSING_SCRIPT.replace_all(&input.normalized_source, "<\\/$1"));
        doc.push_str("\n\n");
        doc.push_str(&self.fill(DRIVER_SCRIPT, generation));
        doc.push_str("\n</script>\n</body>\n</html>\n");
        doc
    }

    fn base_styles(&self) -> String {
        format!(
            "*, *::before, *::after {{ box-sizing: border-box; }}\n\
             html, body {{ margin: 0; padding: 0; }}\n\
             #{mount} {{ min-height: 100vh; }}\n\
             .preview-error {{ padding: 20px; color: #b91c1c; font-family: monospace; }}\n\
             .preview-error pre {{ white-space: pre-wrap; }}\n",
            mount = self.mount_id
        )
    }

    fn fill(&self, template: &str, generation: Generation) -> String {
        template
            .replace("__GENERATION__", &generation.0.to_string())
            .replace("__MOUNT_ID__", &js_string(&self.mount_id))
            .replace("__ENTRY_FILE__", &js_string(&self.entry_file))
            .replace("__SOURCE__", &js_string(MESSAGE_SOURCE))
            .replace("__FALLBACK__", FALLBACK_BINDING)
            .replace("__ENTRY__", ENTRY_BINDING)
    }
}

/// JSON string literal, which is also a valid JS string literal
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string())
        .to_string()
        .replace("</", "<\\/")
}

fn attribute_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(source: &str, css: &str) -> BuildInput {
        BuildInput {
            normalized_source: source.to_string(),
            stylesheet_text: css.to_string(),
        }
    }

    fn synth(source: &str, css: &str) -> String {
        DocumentSynthesizer::new(&PreviewConfig::default()).synthesize(Generation(4), &input(source, css))
    }

    fn pos(doc: &str, needle: &str) -> usize {
        doc.find(needle).unwrap_or_else(|| panic!("missing {needle:?}"))
    }

    #[test]
    fn sections_appear_in_load_order() {
        let doc = synth("function App() { return null; }", "body { color: red; }");
        let reset = pos(&doc, "box-sizing: border-box");
        let sizing = pos(&doc, "#root { min-height: 100vh; }");
        let css = pos(&doc, "body { color: red; }");
        let mount = pos(&doc, "<div id=\"root\"></div>");
        let react = pos(&doc, "react@18/umd/react.development.js");
        let react_dom = pos(&doc, "react-dom@18/umd/react-dom.development.js");
        let babel = pos(&doc, "@babel/standalone/babel.min.js");
        let inline = pos(&doc, "<script type=\"text/babel\">");
        let source = pos(&doc, "function App() { return null; }");
        let driver = pos(&doc, "ReactDOM.createRoot(container)");

        assert!(reset < sizing && sizing < css);
        assert!(css < mount && mount < react);
        assert!(react < react_dom && react_dom < babel && babel < inline);
        assert!(inline < source && source < driver);
    }

    #[test]
    fn hooks_are_bound_before_user_source() {
        let doc = synth("function App() {}", "");
        let hooks = pos(&doc, "const { useState, useEffect, useRef, useMemo, useCallback");
        assert!(hooks < pos(&doc, "function App() {}"));
        assert!(doc.contains("} = React;"));
    }

    #[test]
    fn only_the_runtime_scripts_are_external() {
        let doc = synth("function App() {}", "");
        assert_eq!(doc.matches("src=\"").count(), 3);
        assert!(!doc.contains("href="));
        assert!(!doc.contains("type=\"module\""));
    }

    #[test]
    fn driver_prefers_app_component_then_app() {
        let doc = synth("function App() {}", "");
        let primary = pos(&doc, "typeof AppComponent !== 'undefined' ? AppComponent");
        let fallback = pos(&doc, "typeof App !== 'undefined' ? App");
        assert!(primary < fallback);
        assert!(doc.contains("No entry component found"));
    }

    #[test]
    fn failures_render_an_in_place_panel() {
        let doc = synth("function App() {}", "");
        assert!(doc.contains("catch (error) {\n    window.__previewShowError(error);"));
        assert!(doc.contains("getDerivedStateFromError"));
        assert!(doc.contains("'Check that ' + \"App.tsx\" + ' defines App"));
        assert!(doc.contains("type: type, generation: generation"));
    }

    #[test]
    fn generation_is_embedded() {
        let doc = synth("", "");
        assert!(doc.contains("<meta name=\"preview-generation\" content=\"4\">"));
        assert!(doc.contains("var generation = 4;"));
    }

    #[test]
    fn closing_tags_in_user_text_cannot_escape_their_blocks() {
        let doc = synth("const s = '</script><p>';", "a::after { content: '</STYLE>'; }");
        assert!(doc.contains("const s = '<\\/script><p>';"));
        assert!(doc.contains("content: '<\\/STYLE>';"));
        assert_eq!(doc.matches("</script>").count(), 5);
    }

    #[test]
    fn empty_inputs_still_produce_a_document() {
        let doc = synth("", "");
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.trim_end().ends_with("</html>"));
    }

    #[test]
    fn custom_mount_id_flows_everywhere() {
        let mut config = PreviewConfig::default();
        config.mount_id = "preview".into();
        let doc = DocumentSynthesizer::new(&config).synthesize(Generation(1), &input("", ""));
        assert!(doc.contains("<div id=\"preview\"></div>"));
        assert!(doc.contains("#preview { min-height: 100vh; }"));
        assert!(doc.contains("document.getElementById(\"preview\")"));
    }
}
