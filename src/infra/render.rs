//! Template rendering.
//!
//! Walks the template root recursively and renders every `*.template` file
//! by literal token substitution. Tokens are disjoint, so substitution
//! order does not matter; rendering is fully deterministic for a given
//! template tree and config (modulo the generated app key).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::domain::ProvisionConfig;

/// Suffix that marks a file as a template.
pub const TEMPLATE_SUFFIX: &str = ".template";

/// Rendered files with this suffix are unit descriptors and get routed to
/// the shared unit directory with the node name spliced in.
pub const SERVICE_SUFFIX: &str = ".service";

/// Render every template under `template_root` into the node tree.
///
/// Routing: `<stem>.service.template` becomes
/// `<unit dir>/<stem>-<node>.service` (descriptors from multiple nodes
/// share one install directory and must stay distinguishable); everything
/// else lands at the node root with the `.template` suffix stripped.
/// Outputs are marked executable on non-Windows hosts.
///
/// Returns the rendered paths in walk order.
///
/// # Errors
///
/// Fails if the template root cannot be walked or any file cannot be
/// read or written.
pub fn render_tree(template_root: &Path, cfg: &ProvisionConfig) -> Result<Vec<PathBuf>> {
    let mut rendered = Vec::new();
    for entry in WalkDir::new(template_root) {
        let entry =
            entry.with_context(|| format!("walking {}", template_root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(stem) = name.strip_suffix(TEMPLATE_SUFFIX) else {
            continue;
        };

        let content = std::fs::read_to_string(entry.path())
            .with_context(|| format!("reading {}", entry.path().display()))?;
        let output = substitute(&content, cfg);

        let out_path = output_path(stem, cfg);
        std::fs::write(&out_path, output)
            .with_context(|| format!("writing {}", out_path.display()))?;
        mark_executable(&out_path)?;
        rendered.push(out_path);
    }
    Ok(rendered)
}

/// Replace all placeholder tokens in `content`. Pure string substitution;
/// token strings are matched bit-exact and case-sensitive.
#[must_use]
pub fn substitute(content: &str, cfg: &ProvisionConfig) -> String {
    content
        .replace("%%NODE_NAME%%", &cfg.identity.node_name)
        .replace("%%YAGNA_SERVICE_NAME%%", &cfg.identity.yagna_service_name())
        .replace("%%VANITY_SERVICE_NAME%%", &cfg.identity.vanity_service_name())
        .replace("%%YAGNA_ROOT_DIR%%", &cfg.yagna_root().display().to_string())
        .replace("%%CLI_ROOT_DIR%%", &cfg.cli_dir().display().to_string())
}

fn output_path(stem: &str, cfg: &ProvisionConfig) -> PathBuf {
    if let Some(unit_stem) = stem.strip_suffix(SERVICE_SUFFIX) {
        cfg.unit_dir().join(format!(
            "{unit_stem}-{}{SERVICE_SUFFIX}",
            cfg.identity.node_name
        ))
    } else {
        cfg.service_base_dir().join(stem)
    }
}

/// Service descriptors and wrapper scripts are expected to be runnable.
fn mark_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
            .with_context(|| format!("setting permissions on {}", path.display()))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}
