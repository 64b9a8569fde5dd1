//! String template rendering utilities.

use std::collections::HashMap;

pub struct TemplateVars;

impl TemplateVars {
    pub const ENVIRONMENT: &'static str = "environment";
    pub const ROOT_DIR: &'static str = "rootDir";
    pub const RELEASE: &'static str = "release";
    pub const RELEASE_DIR: &'static str = "releaseDir";
    pub const ROLL_BACK_FROM: &'static str = "rollBackFrom";
    pub const ROLL_BACK_TO: &'static str = "rollBackTo";
    pub const CURRENT_RELEASE: &'static str = "currentRelease";
}

pub fn render_map(template: &str, variables: &HashMap<String, String>) -> String {
    let mut result = template.to_string();

    for (key, value) in variables {
        let placeholder = format!("{{{{{}}}}}", key);
        result = result.replace(&placeholder, value);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_map_replaces_all_occurrences() {
        let mut vars = HashMap::new();
        vars.insert(TemplateVars::RELEASE.to_string(), "1700000000".to_string());
        let rendered = render_map("echo {{release}} {{release}}", &vars);
        assert_eq!(rendered, "echo 1700000000 1700000000");
    }

    #[test]
    fn unknown_placeholders_are_left_alone() {
        let vars = HashMap::new();
        assert_eq!(render_map("echo {{missing}}", &vars), "echo {{missing}}");
    }
}
