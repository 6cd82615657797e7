//! Patches a lesson's HTML entry point so it can be embedded in the channel's viewer.
//!
//! The patch hides the navigation chrome of the original player and forces its router to the
//! lesson's route. It's applied with a streaming rewriter, so everything other than the injected
//! blocks is written back byte for byte and patching an already patched file changes nothing.

use anyhow::{Context, Result};
use indoc::indoc;
use lol_html::{
    element,
    html_content::{ContentType, EndTag},
    rewrite_str, text, RewriteStrSettings,
};
use std::{cell::Cell, fs, path::Path, rc::Rc};

/// The placeholder in [KOLIBRI_JS] replaced by the lesson's route.
pub const ROUTE_PLACEHOLDER: &str = "TO_REPLACE_BY_LESSON_ID";

/// Hides the menus and navigation buttons of the player.
pub const KOLIBRI_CSS: &str = indoc! {r#"

    /*  Added for kolibri usage */
    .lesson--open {
        padding-left: 0px !important;
    }

    .previous-lesson, .page__menu, .lesson-nav--next, .lesson-nav--previous  {
        display: none  !important;
    }

    [data-block-id="ckmkf68hm004f2669qq58b8c4"] {
        display: none;
    }

    nav[aria-label="Navigation menu"] {
      display: none;
    }

    .page-wrap {
        margin-left: 0px !important;
    }
    button.continue-btn.brand--background:not([data-ba]) {
         display: none  !important;
    }

    /*  Added for kolibri usage */
"#};

/// Opens the lesson's route on load and hides the control leading to the next chapter once the
/// page has faded in. The control is found by its English label.
pub const KOLIBRI_JS: &str = indoc! {r#"

    /*  Added for kolibri usage */
        document.addEventListener('DOMContentLoaded', function() {
            window.location.hash = '#/lessons/TO_REPLACE_BY_LESSON_ID';
        });


        document.addEventListener('animationend', function(event) {
          if (event.animationName === 'fadeIn') {
            var allInnerElements = event.target.getElementsByTagName('*');

            for (var i = 0; i < allInnerElements.length; i++) {
                  var element = allInnerElements[i];

              if (element.textContent.trim().includes("Go to Chapter") ||
                  element.textContent.trim().includes("Continue with") )  {
                element.closest('div.noOutline').style.display = 'none';
                break;
              }
            }
          }
        });


    /*  Added for kolibri usage */

"#};

/// Returns the script for the given route.
pub fn lesson_script(route: &str) -> String {
    KOLIBRI_JS.replace(ROUTE_PLACEHOLDER, route)
}

/// What the document already contains.
#[derive(Debug, Default)]
struct Existing {
    has_head: bool,
    /// Whether the first `<head>` is closed by an explicit `</head>`.
    head_closed: bool,
    styles: Vec<String>,
    scripts: Vec<String>,
}

/// Collects the text of every `<style>` and `<script>` element and whether there's a `<head>`.
fn scan(html: &str) -> Result<Existing> {
    let mut has_head = false;
    let head_closed = Rc::new(Cell::new(false));
    let mut styles = Vec::new();
    let mut scripts = Vec::new();
    let mut style_text = String::new();
    let mut script_text = String::new();

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("head", |el| {
                    if !has_head {
                        has_head = true;
                        let head_closed = Rc::clone(&head_closed);
                        let handler: lol_html::EndTagHandler<'static> =
                            Box::new(move |_: &mut EndTag| {
                                head_closed.set(true);
                                Ok(())
                            });
                        el.on_end_tag(handler)?;
                    }
                    Ok(())
                }),
                text!("style", |chunk| {
                    style_text.push_str(chunk.as_str());
                    if chunk.last_in_text_node() {
                        styles.push(std::mem::take(&mut style_text));
                    }
                    Ok(())
                }),
                text!("script", |chunk| {
                    script_text.push_str(chunk.as_str());
                    if chunk.last_in_text_node() {
                        scripts.push(std::mem::take(&mut script_text));
                    }
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )?;

    Ok(Existing {
        has_head,
        head_closed: head_closed.get(),
        styles,
        scripts,
    })
}

/// Returns the HTML with the style and the script for the given route added to its `<head>`. A
/// `<head>` is created at the start of the document if there's none. The blocks go at the end of
/// the first `<head>`, or right after its start tag when the document never closes it. Blocks
/// already present with identical contents are not added again.
pub fn patch_html(html: &str, route: &str) -> Result<String> {
    let existing = scan(html)?;
    let script = lesson_script(route);

    let mut injection = String::new();
    if !existing.styles.iter().any(|style| style == KOLIBRI_CSS) {
        injection.push_str(&format!("<style>{KOLIBRI_CSS}</style>"));
    }
    if !existing.scripts.iter().any(|existing| *existing == script) {
        injection.push_str(&format!(
            "<script type=\"text/javascript\">{script}</script>"
        ));
    }
    if injection.is_empty() && existing.has_head {
        return Ok(html.to_string());
    }

    let source = if existing.has_head {
        html.to_string()
    } else {
        format!("<head></head>{html}")
    };
    let at_end = !existing.has_head || existing.head_closed;

    // Only the first head receives the blocks.
    let mut patched = false;
    let output = rewrite_str(
        &source,
        RewriteStrSettings {
            element_content_handlers: vec![element!("head", |el| {
                if !patched {
                    if at_end {
                        el.append(&injection, ContentType::Html);
                    } else {
                        el.prepend(&injection, ContentType::Html);
                    }
                    patched = true;
                }
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )?;
    Ok(output)
}

/// Patches the HTML file at the given path in place.
pub fn patch_entry_point(path: &Path, route: &str) -> Result<()> {
    let html = fs::read_to_string(path)
        .with_context(|| format!("Failed to read HTML entry point: {}", path.display()))?;
    let patched = patch_html(&html, route)
        .with_context(|| format!("Failed to patch HTML entry point: {}", path.display()))?;
    if patched != html {
        fs::write(path, patched)
            .with_context(|| format!("Failed to write HTML entry point: {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    /// Verifies patching an empty head.
    #[test]
    fn test_patch_empty_head() {
        let patched = patch_html("<html><head></head><body></body></html>", "foo/bar").unwrap();
        assert_eq!(1, patched.matches("<style>").count());
        assert_eq!(1, patched.matches(KOLIBRI_CSS).count());
        assert_eq!(1, patched.matches("<script type=\"text/javascript\">").count());
        assert!(patched.contains("window.location.hash = '#/lessons/foo/bar';"));
        assert!(!patched.contains(ROUTE_PLACEHOLDER));

        // Both blocks are inside the head.
        let head_end = patched.find("</head>").unwrap();
        assert!(patched.find("<style>").unwrap() < head_end);
        assert!(patched.find("</script>").unwrap() < head_end);
        assert!(patched.ends_with("</head><body></body></html>"));
    }

    /// Verifies that patching twice produces the same document.
    #[test]
    fn test_patch_idempotent() {
        let html = "<!DOCTYPE html><html><head><title>Lesson</title></head><body>\
            <script>var x = 1;</script></body></html>";
        let once = patch_html(html, "abc").unwrap();
        let twice = patch_html(&once, "abc").unwrap();
        assert_eq!(once, twice);
        assert_eq!(1, twice.matches(KOLIBRI_CSS).count());
        assert_eq!(1, twice.matches("#/lessons/abc").count());
    }

    /// Verifies that a different route adds a second script but not a second style.
    #[test]
    fn test_patch_new_route() {
        let once = patch_html("<head></head>", "abc").unwrap();
        let twice = patch_html(&once, "def").unwrap();
        assert_eq!(1, twice.matches("<style>").count());
        assert_eq!(2, twice.matches("<script").count());
        assert!(twice.contains("#/lessons/def"));
    }

    /// Verifies that a head is created when missing.
    #[test]
    fn test_patch_missing_head() {
        let patched = patch_html("<body><p>Hello</p></body>", "abc").unwrap();
        assert!(patched.starts_with("<head><style>"));
        assert!(patched.ends_with("</script></head><body><p>Hello</p></body>"));
    }

    /// Verifies that the blocks stay inside a head that's never closed.
    #[test]
    fn test_patch_unclosed_head() {
        let html = "<html><head><title>T</title><body>x</body></html>";
        let patched = patch_html(html, "abc").unwrap();
        let injected = format!(
            "<style>{KOLIBRI_CSS}</style><script type=\"text/javascript\">{}</script>",
            lesson_script("abc")
        );
        assert_eq!(
            html.replacen("<head>", &format!("<head>{injected}"), 1),
            patched
        );
        assert!(patched.find("</script>").unwrap() < patched.find("<title>").unwrap());
        assert_eq!(patched, patch_html(&patched, "abc").unwrap());
    }

    /// Verifies that the rest of the document is left untouched.
    #[test]
    fn test_patch_preserves_document() {
        let html = "<html>\n  <head>\n    <meta charset=\"utf-8\">\n  </head>\n  <body   class=x>\
            &amp; <br/></body>\n</html>\n";
        let patched = patch_html(html, "abc").unwrap();
        let injected = format!(
            "<style>{KOLIBRI_CSS}</style><script type=\"text/javascript\">{}</script>",
            lesson_script("abc")
        );
        assert_eq!(html.replacen("</head>", &format!("{injected}</head>"), 1), patched);
    }

    /// Verifies patching a file in place.
    #[test]
    fn test_patch_entry_point() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("index.html");
        fs::write(&path, "<html><head></head></html>").unwrap();

        patch_entry_point(&path, "route").unwrap();
        let once = fs::read(&path).unwrap();
        patch_entry_point(&path, "route").unwrap();
        assert_eq!(once, fs::read(&path).unwrap());

        assert!(patch_entry_point(&temp_dir.path().join("missing.html"), "route").is_err());
    }
}
