//! Subcommands and the file helpers they share.

pub mod check;
pub mod render;

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use ignore::Walk;
use tessera_atelier::{compile_with_options, CompileOptions, Compiled, TemplateRegistry};

pub type CliResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// Template file extension picked up by directory walks.
pub const TEMPLATE_EXTENSION: &str = "stache";

/// Parse a `name=path` partial argument.
pub fn parse_partial(arg: &str) -> Result<(String, PathBuf), String> {
    match arg.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => {
            Ok((name.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected NAME=PATH, got `{arg}`")),
    }
}

/// Read and compile a template file, naming it after its path.
pub fn compile_file(path: &Path) -> CliResult<Compiled> {
    let source = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let options = CompileOptions::default().with_filename(path.display().to_string());
    Ok(compile_with_options(&source, &options)?)
}

/// Compile partial files and register them on the global registry.
pub fn register_partials<'a>(
    partials: impl IntoIterator<Item = (&'a str, PathBuf)>,
) -> CliResult<()> {
    let registry = TemplateRegistry::global();
    for (name, path) in partials {
        let compiled = compile_file(&path)?;
        registry.register_partial(name, compiled.view)?;
    }
    Ok(())
}

/// Collect template files under the given paths (respects .gitignore).
pub fn collect_templates(patterns: &[String]) -> Vec<PathBuf> {
    patterns
        .iter()
        .flat_map(|pattern| {
            Walk::new(pattern)
                .filter_map(|e| e.ok())
                .filter(|e| e.path().extension().is_some_and(|ext| ext == TEMPLATE_EXTENSION))
                .map(|e| e.path().to_path_buf())
                .collect::<Vec<_>>()
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Fresh scratch directory under the system temp dir.
    pub(crate) fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tessera-cli-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_parse_partial() {
        assert_eq!(
            parse_partial("nav=partials/nav.stache").unwrap(),
            ("nav".to_string(), PathBuf::from("partials/nav.stache"))
        );
        assert!(parse_partial("nav").is_err());
        assert!(parse_partial("=x.stache").is_err());
        assert!(parse_partial("nav=").is_err());
    }

    #[test]
    fn test_compile_file_names_errors() {
        let dir = scratch_dir("compile");
        let path = dir.join("broken.stache");
        fs::write(&path, "{{#a}}").unwrap();
        let err = compile_file(&path).unwrap_err().to_string();
        assert!(err.starts_with(&path.display().to_string()), "{err}");
    }

    #[test]
    fn test_collect_templates_filters_extension() {
        let dir = scratch_dir("collect");
        fs::write(dir.join("a.stache"), "a").unwrap();
        fs::write(dir.join("b.html"), "b").unwrap();
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::write(dir.join("nested/c.stache"), "c").unwrap();

        let mut files = collect_templates(&[dir.display().to_string()]);
        files.sort();
        assert_eq!(files, vec![dir.join("a.stache"), dir.join("nested/c.stache")]);
    }

    #[test]
    fn test_register_partials() {
        let dir = scratch_dir("partials");
        let path = dir.join("badge.stache");
        fs::write(&path, "<i>{{n}}</i>").unwrap();
        register_partials([("cli-test-badge", path)]).unwrap();
        assert!(TemplateRegistry::global().contains("cli-test-badge"));
    }
}
