//! String template rendering utilities.

use std::collections::HashMap;

pub struct TemplateVars;

impl TemplateVars {
    pub const SERVER: &'static str = "server";
    pub const DATABASE: &'static str = "database";
    pub const USER: &'static str = "user";
    pub const PASSWORD_FILE: &'static str = "password_file";
    pub const INPUT_FILE: &'static str = "input_file";
    pub const CANDIDATE_FILE: &'static str = "candidate_file";
    pub const OUTPUT_DIR: &'static str = "output_dir";
}

/// Replace every `{{key}}` with its value; unknown placeholders are left as-is.
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
    fn render_map_replaces_every_occurrence() {
        let mut vars = HashMap::new();
        vars.insert(TemplateVars::SERVER.to_string(), "MGD_DEV".to_string());
        vars.insert(TemplateVars::DATABASE.to_string(), "mgd".to_string());
        let out = render_map("-S{{server}} -D{{database}} {{server}}", &vars);
        assert_eq!(out, "-SMGD_DEV -Dmgd MGD_DEV");
    }

    #[test]
    fn render_map_leaves_unknown_placeholders() {
        let mut vars = HashMap::new();
        vars.insert(TemplateVars::USER.to_string(), "mgd_dbo".to_string());
        assert_eq!(render_map("{{user}}/{{other}}", &vars), "mgd_dbo/{{other}}");
    }
}
