//! Argument lists for the external programs.

use std::collections::HashMap;
use std::path::Path;

use crate::config::{Connection, LoadConfig, ReloadSettings};
use crate::error::{Error, Result};
use crate::process::Invocation;
use crate::utils::template::{self, TemplateVars};

/// Environment handed to schema scripts, which take no arguments.
pub const ENV_SCRIPT_SERVER: &str = "ANNOTLOAD_DBSERVER";
pub const ENV_SCRIPT_DATABASE: &str = "ANNOTLOAD_DBNAME";
pub const ENV_SCRIPT_USER: &str = "ANNOTLOAD_DBUSER";
pub const ENV_SCRIPT_PASSWORD_FILE: &str = "ANNOTLOAD_DBPASSWORDFILE";

fn with_connection(invocation: Invocation, connection: &Connection) -> Invocation {
    invocation
        .flag("-S", &connection.server)
        .flag("-D", &connection.database)
        .flag("-U", &connection.user)
        .flag("-P", connection.password_file.display().to_string())
}

/// Values for `{{key}}` placeholders in configured argument templates.
fn template_vars(config: &LoadConfig) -> HashMap<String, String> {
    let connection = &config.connection;
    let mut vars = HashMap::new();
    vars.insert(TemplateVars::SERVER.to_string(), connection.server.clone());
    vars.insert(TemplateVars::DATABASE.to_string(), connection.database.clone());
    vars.insert(TemplateVars::USER.to_string(), connection.user.clone());
    vars.insert(
        TemplateVars::PASSWORD_FILE.to_string(),
        connection.password_file.display().to_string(),
    );
    vars.insert(
        TemplateVars::INPUT_FILE.to_string(),
        config.input_file.display().to_string(),
    );
    vars.insert(
        TemplateVars::OUTPUT_DIR.to_string(),
        config.output_dir.display().to_string(),
    );
    vars
}

/// Generator run with its argument templates expanded, plus `-E <editor>`
/// when one is set. Runs in the directory its derived files land in.
pub fn generator(config: &LoadConfig) -> Result<Invocation> {
    let program = config
        .generator
        .as_deref()
        .ok_or_else(|| Error::config_missing_key("tools.generator", None))?;

    let vars = template_vars(config);
    let args = config
        .generator_args
        .iter()
        .map(|arg| template::render_map(arg, &vars));
    let mut invocation = Invocation::new(program).args(args);

    if let Some(editor) = &config.editor {
        invocation = invocation.flag("-E", editor);
    }

    Ok(invocation.current_dir(config.derived_dir()))
}

/// Bulk loader run: `-S -D -U -P -M <mode> -I <file> -A <type> -R <ref> [-O]`.
pub fn loader(config: &LoadConfig, file: &Path) -> Invocation {
    let invocation = with_connection(Invocation::new(&config.loader), &config.connection)
        .flag("-M", config.mode.as_str())
        .flag("-I", file.display().to_string())
        .flag("-A", &config.annotation_type)
        .flag("-R", &config.delete_reference);

    let invocation = if config.load_obsolete {
        invocation.arg("-O")
    } else {
        invocation
    };

    invocation.current_dir(&config.output_dir)
}

/// Promote/broadcast run with its argument templates expanded.
pub fn promote(config: &LoadConfig, settings: &ReloadSettings) -> Invocation {
    let mut vars = template_vars(config);
    vars.insert(
        TemplateVars::CANDIDATE_FILE.to_string(),
        settings.promote_input.display().to_string(),
    );

    let args = settings
        .promote_args
        .iter()
        .map(|arg| template::render_map(arg, &vars));

    let invocation = Invocation::new(&settings.promote_program).args(args);
    match settings.promote_input.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(dir) => invocation.current_dir(dir),
        None => invocation,
    }
}

/// Schema-maintenance script; connection details travel in the environment.
pub fn schema_script(config: &LoadConfig, script: &str) -> Invocation {
    let connection = &config.connection;
    Invocation::new(script)
        .env(ENV_SCRIPT_SERVER, &connection.server)
        .env(ENV_SCRIPT_DATABASE, &connection.database)
        .env(ENV_SCRIPT_USER, &connection.user)
        .env(
            ENV_SCRIPT_PASSWORD_FILE,
            connection.password_file.display().to_string(),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FileConfig, JobKind, Overrides};
    use std::path::PathBuf;

    fn config(job: JobKind, extra: &str) -> LoadConfig {
        let file: FileConfig = serde_json::from_str(extra).unwrap();
        let overrides = Overrides {
            server: Some("MGD_DEV".to_string()),
            database: Some("mgd".to_string()),
            input_file: Some("/data/riken/sample.txt".to_string()),
            mode: Some("new".to_string()),
            user: Some("mgd_dbo".to_string()),
            password_file: Some("/opt/.pgpass".to_string()),
            annotation_type: Some("GO/Marker".to_string()),
            output_dir: Some("/data/out".to_string()),
            ..Default::default()
        };
        LoadConfig::resolve(file.with_overrides(&overrides), job).unwrap()
    }

    #[test]
    fn loader_args_follow_flag_order() {
        let cfg = config(JobKind::Load, "{}");
        let inv = loader(&cfg, Path::new("/data/out/sample.txt.annotload"));
        assert_eq!(inv.program, "annotload.py");
        assert_eq!(
            inv.args,
            vec![
                "-S", "MGD_DEV", "-D", "mgd", "-U", "mgd_dbo", "-P", "/opt/.pgpass", "-M", "new",
                "-I", "/data/out/sample.txt.annotload", "-A", "GO/Marker", "-R", "J:0",
            ]
        );
        assert_eq!(inv.working_dir, Some(PathBuf::from("/data/out")));
    }

    #[test]
    fn loader_adds_obsolete_flag() {
        let cfg = config(JobKind::Load, r#"{"load_obsolete": true}"#);
        let inv = loader(&cfg, Path::new("x.annotload"));
        assert_eq!(inv.args.last().map(String::as_str), Some("-O"));
    }

    #[test]
    fn annotation_type_stays_one_argument() {
        let mut cfg = config(JobKind::Load, "{}");
        cfg.annotation_type = "Mammalian Phenotype/Genotype".to_string();
        let inv = loader(&cfg, Path::new("x.annotload"));
        let pos = inv.args.iter().position(|a| a == "-A").unwrap();
        assert_eq!(inv.args[pos + 1], "Mammalian Phenotype/Genotype");
    }

    #[test]
    fn generator_includes_editor_when_set() {
        let cfg = config(
            JobKind::Translate,
            r#"{"tools": {"generator": "phenoslimgenotype.py"}, "editor": "csmith"}"#,
        );
        let inv = generator(&cfg).unwrap();
        assert_eq!(inv.program, "phenoslimgenotype.py");
        assert_eq!(&inv.args[8..], &["-I", "/data/riken/sample.txt", "-E", "csmith"]);
    }

    #[test]
    fn generator_defaults_to_connection_and_input_flags() {
        let cfg = config(JobKind::Translate, r#"{"tools": {"generator": "rikengo.py"}}"#);
        let inv = generator(&cfg).unwrap();
        assert_eq!(
            inv.args,
            vec![
                "-S", "MGD_DEV", "-D", "mgd", "-U", "mgd_dbo", "-P", "/opt/.pgpass", "-I",
                "/data/riken/sample.txt",
            ]
        );
        assert_eq!(inv.working_dir, Some(PathBuf::from("/data/out")));
    }

    #[test]
    fn gomarker_takes_its_own_argument_set() {
        let cfg = config(
            JobKind::Translate,
            r#"{"tools": {
                "generator": "gomarker.py",
                "generator_args": ["-S", "{{server}}", "-D", "{{database}}", "-I", "{{input_file}}"],
                "generator_output": "input_dir"
            }}"#,
        );
        let inv = generator(&cfg).unwrap();
        assert_eq!(inv.program, "gomarker.py");
        assert_eq!(
            inv.args,
            vec!["-S", "MGD_DEV", "-D", "mgd", "-I", "/data/riken/sample.txt"]
        );
        assert_eq!(inv.working_dir, Some(PathBuf::from("/data/riken")));

        let load = loader(&cfg, &cfg.annotation_file().unwrap());
        let pos = load.args.iter().position(|a| a == "-I").unwrap();
        assert_eq!(load.args[pos + 1], "/data/riken/sample.txt.annotload");
    }

    #[test]
    fn generator_without_arguments() {
        let cfg = config(
            JobKind::Translate,
            r#"{"tools": {"generator": "goa.py", "generator_args": []}}"#,
        );
        assert!(generator(&cfg).unwrap().args.is_empty());
    }

    #[test]
    fn generator_requires_program() {
        let cfg = config(JobKind::Load, "{}");
        assert!(generator(&cfg).is_err());
    }

    #[test]
    fn promote_expands_templates() {
        let cfg = config(
            JobKind::Reload,
            r#"{
                "schema_dir": "/mgi/schema",
                "tools": {"generator": "rikengo.py"},
                "reload": {"promote": {
                    "program": "/opt/riken/prepub.sh",
                    "args": ["{{server}}", "{{database}}", "--file={{candidate_file}}"],
                    "input_file": "/opt/riken/input/newgenes"
                }}
            }"#,
        );
        let settings = cfg.reload_settings().unwrap();
        let inv = promote(&cfg, settings);
        assert_eq!(
            inv.args,
            vec!["MGD_DEV", "mgd", "--file=/opt/riken/input/newgenes"]
        );
        assert_eq!(inv.working_dir, Some(PathBuf::from("/opt/riken/input")));
    }

    #[test]
    fn schema_script_passes_connection_in_env() {
        let cfg = config(JobKind::Load, "{}");
        let inv = schema_script(&cfg, "/mgi/schema/table/VOC_Annot_truncate.object");
        assert!(inv.args.is_empty());
        assert!(inv
            .env
            .contains(&(ENV_SCRIPT_SERVER.to_string(), "MGD_DEV".to_string())));
    }
}
