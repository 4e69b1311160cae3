use crate::output::is_quiet;
use crate::table::Value;
use crate::ui::{theme, Icons};
use owo_colors::OwoColorize;

pub fn banner(title: &str) {
    if is_quiet() {
        return;
    }
    let rule = "=".repeat(60);
    println!("{}", rule.style(theme().dim.clone()));
    println!("{}", title.style(theme().header.clone()));
    println!("{}", rule.style(theme().dim.clone()));
}

pub fn header(text: &str) {
    if is_quiet() {
        return;
    }
    println!("{} {}", Icons::ROCKET, text.style(theme().header.clone()));
}

pub fn status(icon: &str, label: &str, value: &str) {
    if is_quiet() {
        return;
    }
    println!("{} {}: {}", icon, label.style(theme().dim.clone()), value);
}

pub fn success(label: &str) {
    if is_quiet() {
        return;
    }
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warn.clone()));
}

pub fn section(title: &str) {
    if is_quiet() {
        return;
    }
    println!();
    println!("━{}━", title.style(theme().header.clone()));
}

/// One line per class label, colored fraud/legitimate
pub fn class_row(class: &Value, text: &str) {
    if is_quiet() {
        return;
    }
    println!("{}", class_line(class, text));
}

fn class_line(class: &Value, text: &str) -> String {
    let fraud = class.as_i64() == Some(1);
    let icon = if fraud { Icons::FRAUD } else { Icons::LEGIT };
    format!("  {} {}", icon, text.style(theme().class(fraud)))
}

pub fn timing(elapsed: &str) {
    if is_quiet() {
        return;
    }
    println!("{} {}", Icons::CLOCK.style(theme().dim.clone()), elapsed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_line_icons() {
        assert!(class_line(&Value::Integer(1), "Class 1").contains(Icons::FRAUD));
        assert!(class_line(&Value::Integer(0), "Class 0").contains(Icons::LEGIT));
        assert!(class_line(&Value::Null, "Class NULL").contains(Icons::LEGIT));
    }
}
