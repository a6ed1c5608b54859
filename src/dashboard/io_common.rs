use std::collections::HashSet;
use std::path::Path;

use log::warn;

/// The cells of a source, before they are mapped onto the schema.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct RawSheet {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// A file name fragment for a role: letters and digits of any script are
/// kept, everything else becomes an underscore.
pub fn role_slug(role: &str) -> String {
    let s: String = role
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    if s.is_empty() {
        "blank".to_string()
    } else {
        s
    }
}

/// One slug per role. Roles that would share a slug get a numeric suffix,
/// so that no file overwrites another.
pub fn unique_role_slugs(roles: &[String]) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut res: Vec<String> = Vec::new();
    for role in roles.iter() {
        let base = role_slug(role);
        let mut slug = base.clone();
        let mut n = 2;
        while taken.contains(&slug) {
            slug = format!("{}_{}", base, n);
            n += 1;
        }
        if slug != base {
            warn!("Role {:?} collides with another role on {:?}, using {:?}", role, base, slug);
        }
        taken.insert(slug.clone());
        res.push(slug);
    }
    res
}
