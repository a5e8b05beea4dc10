// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub const BREADCRUMB_SEPARATOR: &str = " > ";

/// View history. Entry 0 is the root and is never popped; an empty stack is
/// only reachable through `set_stack(vec![])`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationStack {
    entries: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crumb<'a> {
    pub label: &'a str,
    pub current: bool,
}

impl NavigationStack {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            entries: vec![root.into()],
        }
    }

    pub fn push(&mut self, name: impl Into<String>) {
        self.entries.push(name.into());
    }

    pub fn pop(&mut self) -> Option<String> {
        if self.entries.len() <= 1 {
            return None;
        }
        self.entries.pop()
    }

    pub fn clear(&mut self) {
        self.entries.truncate(1);
    }

    pub fn set_stack(&mut self, entries: Vec<String>) {
        self.entries = entries;
    }

    pub fn current(&self) -> &str {
        self.entries.last().map(String::as_str).unwrap_or("")
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn can_go_back(&self) -> bool {
        self.entries.len() > 1
    }

    pub fn crumbs(&self) -> Vec<Crumb<'_>> {
        let last = self.entries.len().saturating_sub(1);
        self.entries
            .iter()
            .enumerate()
            .map(|(index, label)| Crumb {
                label,
                current: index == last,
            })
            .collect()
    }

    pub fn breadcrumb(&self) -> String {
        self.crumbs()
            .iter()
            .map(|crumb| {
                if crumb.current {
                    format!("[{}]", crumb.label)
                } else {
                    crumb.label.to_owned()
                }
            })
            .collect::<Vec<_>>()
            .join(BREADCRUMB_SEPARATOR)
    }
}

#[cfg(test)]
mod tests {
    use super::NavigationStack;

    #[test]
    fn root_is_never_popped() {
        let mut stack = NavigationStack::new("containers");
        assert_eq!(stack.pop(), None);
        assert_eq!(stack.current(), "containers");
    }

    #[test]
    fn push_and_pop_follow_lifo_order() {
        let mut stack = NavigationStack::new("repos");
        stack.push("issues");
        stack.push("issue #4");
        assert_eq!(stack.pop().as_deref(), Some("issue #4"));
        assert_eq!(stack.current(), "issues");
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn clear_keeps_only_root() {
        let mut stack = NavigationStack::new("root");
        stack.push("a");
        stack.push("b");
        stack.clear();
        assert_eq!(stack.entries(), &["root".to_owned()]);
    }

    #[test]
    fn set_stack_may_empty_the_stack() {
        let mut stack = NavigationStack::new("root");
        stack.set_stack(Vec::new());
        assert!(stack.is_empty());
        assert_eq!(stack.current(), "");
        assert_eq!(stack.pop(), None);
        stack.clear();
        assert!(stack.is_empty());
    }

    #[test]
    fn set_stack_replaces_wholesale() {
        let mut stack = NavigationStack::new("root");
        stack.set_stack(vec!["ctx".to_owned(), "pods".to_owned()]);
        assert_eq!(stack.current(), "pods");
        assert!(stack.can_go_back());
    }

    #[test]
    fn breadcrumb_marks_current_entry() {
        let mut stack = NavigationStack::new("processes");
        assert_eq!(stack.breadcrumb(), "[processes]");
        stack.push("pid 42");
        assert_eq!(stack.breadcrumb(), "processes > [pid 42]");
    }

    #[test]
    fn clones_are_independent() {
        let mut stack = NavigationStack::new("root");
        let snapshot = stack.clone();
        stack.push("child");
        assert_eq!(snapshot.len(), 1);
        assert_eq!(stack.len(), 2);
    }
}
