use std::path::{Path, PathBuf};

/// Resolves paths written in a config file relative to that file's directory.
#[derive(Clone)]
pub struct PathResolver {
    base_dir: PathBuf,
}

impl PathResolver {
    pub fn new(config_path: &Path) -> Self {
        let base_dir = config_path
            .parent()
            .unwrap_or(Path::new("."))
            .to_path_buf();
        Self { base_dir }
    }

    pub fn resolve(&self, p: &Path) -> PathBuf {
        if p.as_os_str().is_empty() || p.is_absolute() {
            return p.to_path_buf();
        }
        self.join_clean(p)
    }

    pub fn resolve_in_place(&self, p: &mut PathBuf) {
        *p = self.resolve(p);
    }

    fn join_clean(&self, rel: &Path) -> PathBuf {
        let joined = self.base_dir.join(rel);

        let mut out = PathBuf::new();
        for c in joined.components() {
            use std::path::Component::*;
            match c {
                CurDir => {}
                ParentDir => {
                    out.pop();
                }
                RootDir | Prefix(_) | Normal(_) => out.push(c.as_os_str()),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_join_config_dir() {
        let r = PathResolver::new(Path::new("/etc/perf/perfsuite.yaml"));
        assert_eq!(r.resolve(Path::new("./data/perf.db")), PathBuf::from("/etc/perf/data/perf.db"));
        assert_eq!(r.resolve(Path::new("../apks")), PathBuf::from("/etc/apks"));
    }

    #[test]
    fn absolute_and_empty_untouched() {
        let r = PathResolver::new(Path::new("/etc/perf/perfsuite.yaml"));
        assert_eq!(r.resolve(Path::new("/var/perf.db")), PathBuf::from("/var/perf.db"));
        assert_eq!(r.resolve(Path::new("")), PathBuf::new());
    }
}
