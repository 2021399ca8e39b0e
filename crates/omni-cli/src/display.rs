//! Display formatting for CLI output

use console::{Style, style};
use omni_core::{TemplateBundle, TemplateDocument};
use similar::{ChangeTag, TextDiff};

/// Context lines kept around each changed hunk
const CONTEXT_LINES: usize = 3;

/// Render a colored line diff between two templates
pub fn render_diff(old: &str, new: &str) -> String {
    let diff = TextDiff::from_lines(old, new);
    let mut output = String::new();

    for (i, group) in diff.grouped_ops(CONTEXT_LINES).iter().enumerate() {
        if i > 0 {
            output.push_str(&format!("{}\n", style("...").dim()));
        }
        for op in group {
            for change in diff.iter_changes(op) {
                let (sign, line_style) = match change.tag() {
                    ChangeTag::Delete => ("-", Style::new().red()),
                    ChangeTag::Insert => ("+", Style::new().green()),
                    ChangeTag::Equal => (" ", Style::new().dim()),
                };
                output.push_str(&format!(
                    "{}{}",
                    line_style.apply_to(sign),
                    line_style.apply_to(change.value())
                ));
                if change.missing_newline() {
                    output.push('\n');
                }
            }
        }
    }

    output
}

/// One line per fragment: kind and name
pub fn bundle_summary(bundle: &TemplateBundle) -> Vec<String> {
    std::iter::once(&bundle.cluster)
        .chain(std::iter::once(&bundle.control_plane))
        .chain(&bundle.workers)
        .chain(&bundle.machines)
        .filter_map(|fragment| TemplateDocument::parse(fragment).ok().flatten())
        .map(|document| {
            let kind = document.kind().as_str();
            match (&document, document.name()) {
                (TemplateDocument::ControlPlane(set), _) => {
                    format!("{:<13} {} machine(s)", kind, set.machines.len())
                }
                (TemplateDocument::Workers(set), name) => {
                    format!("{:<13} {} ({} machine(s))", kind, name, set.machines.len())
                }
                (_, name) => format!("{:<13} {}", kind, name),
            }
        })
        .collect()
}

pub fn print_problems(problems: &[String]) {
    for problem in problems {
        println!("  {} {}", style("✗").red(), problem);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_diff_marks_changes() {
        console::set_colors_enabled(false);

        let old = "kind: Cluster\nname: prod\nkubernetes:\n  version: v1.29.0\n";
        let new = "kind: Cluster\nname: prod\nkubernetes:\n  version: v1.30.1\n";
        assert_eq!(
            render_diff(old, new),
            " kind: Cluster\n name: prod\n kubernetes:\n-  version: v1.29.0\n+  version: v1.30.1\n"
        );
    }

    #[test]
    fn test_render_diff_without_trailing_newline() {
        console::set_colors_enabled(false);

        let rendered = render_diff("name: a", "name: b");
        assert_eq!(rendered, "-name: a\n+name: b\n");
    }

    #[test]
    fn test_bundle_summary() {
        let bundle = TemplateBundle::new(
            "kind: Cluster\nname: prod\n",
            "kind: ControlPlane\nmachines: [cp-1, cp-2]\n",
        )
        .with_worker("kind: Workers\nname: general\nmachines: [w-1]\n")
        .with_machine("kind: Machine\nname: cp-1\n");

        assert_eq!(
            bundle_summary(&bundle),
            vec![
                "Cluster       prod",
                "ControlPlane  2 machine(s)",
                "Workers       general (1 machine(s))",
                "Machine       cp-1",
            ]
        );
    }
}
