//! Generation driver: one template, one context per target, one document out.
//!
//! All inputs (configuration, platform data, registry) are loaded up front by
//! [`Generator::load`]. Targets of a class are expanded in parallel; results
//! come back in declaration order regardless of scheduling. Files are written
//! only after expansion has finished.

use crate::config::{ClassConfig, Config};
use crate::context::{self, ClassInfo, Placement};
use crate::error::{Error, Result};
use crate::model::Target;
use crate::platform::PlatformData;
use crate::registry::Registry;
use crate::render::{self, Renderer};
use crate::slug;
use crate::template::Template;
use glob::Pattern;
use rayon::prelude::*;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A finished document for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDoc {
    pub target: String,
    pub url: String,
    /// Where the document is written, anchored at the project root.
    pub output_path: PathBuf,
    pub text: String,
}

/// Every error that kept one target from producing output.
#[derive(Debug)]
pub struct TargetFailure {
    pub target: String,
    pub errors: Vec<Error>,
}

impl fmt::Display for TargetFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "target '{}' failed with {} error(s)",
            self.target,
            self.errors.len()
        )?;
        for error in &self.errors {
            write!(f, "\n  {}", error)?;
        }
        Ok(())
    }
}

pub type Outcome = std::result::Result<RenderedDoc, TargetFailure>;

/// Per-target results of one class, in target declaration order.
#[derive(Debug)]
pub struct ClassReport {
    pub class: String,
    pub results: Vec<(String, Outcome)>,
}

impl ClassReport {
    pub fn get(&self, target: &str) -> Option<&Outcome> {
        self.results
            .iter()
            .find(|(key, _)| key == target)
            .map(|(_, outcome)| outcome)
    }

    pub fn rendered(&self) -> impl Iterator<Item = &RenderedDoc> {
        self.results.iter().filter_map(|(_, o)| o.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &TargetFailure> {
        self.results.iter().filter_map(|(_, o)| o.as_ref().err())
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// What [`Generator::write`] did.
#[derive(Debug, Default)]
pub struct WriteSummary {
    pub written: usize,
    pub unchanged: usize,
    /// Documents that rendered but could not be written.
    pub failures: Vec<TargetFailure>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    Missing,
    Outdated,
    Unreadable,
}

impl fmt::Display for Staleness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Staleness::Missing => f.write_str("missing"),
            Staleness::Outdated => f.write_str("out of date"),
            Staleness::Unreadable => f.write_str("unreadable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleDoc {
    pub target: String,
    pub path: PathBuf,
    pub reason: Staleness,
}

pub struct Generator {
    config: Config,
    registry: Registry,
    platforms: BTreeMap<String, PlatformData>,
}

impl Generator {
    /// Load every class's platform data and build the reference registry.
    pub fn load(config: Config) -> Result<Self> {
        let mut registry = Registry::new();

        if let Some(corpus) = &config.registry.corpus {
            let corpus = config.resolve(corpus);
            let count = registry.scan(&corpus)?;
            tracing::info!(corpus = %corpus.display(), documents = count, "indexed corpus");
        }
        for (key, path) in &config.registry.entries {
            registry.insert(key.as_str(), path.as_str())?;
        }

        let mut platforms = BTreeMap::new();
        for (class_key, class) in &config.classes {
            let data = PlatformData::load(&config.resolve(&class.platforms))?;
            check_slugs(&data)?;
            let prefix = class.key_prefix(class_key);
            for target in data.targets() {
                let url = slug::url_for(&class.url_prefix, &slug::slug(&target.key));
                registry.insert(format!("{}.{}", prefix, target.key), url)?;
            }
            platforms.insert(class_key.clone(), data);
        }

        tracing::debug!(
            references = registry.len(),
            classes = platforms.len(),
            "generator ready"
        );
        Ok(Self {
            config,
            registry,
            platforms,
        })
    }

    pub fn class_keys(&self) -> impl Iterator<Item = &str> {
        self.platforms.keys().map(String::as_str)
    }

    /// Targets of `class` in declaration order.
    pub fn targets(&self, class: &str) -> Result<&[Target]> {
        Ok(self.platform_data(class)?.targets())
    }

    pub fn resolve(&self, key: &str) -> Option<Cow<'_, str>> {
        self.registry.get(key)
    }

    /// Expand every target of `class` matching `filters` (all when empty).
    ///
    /// A broken template fails the whole class; anything else fails only the
    /// target it happened in.
    pub fn generate(&self, class: &str, filters: &[Pattern]) -> Result<ClassReport> {
        let data = self.platform_data(class)?;
        let selected: Vec<&Target> = data
            .targets()
            .iter()
            .filter(|t| filters.is_empty() || filters.iter().any(|p| p.matches(&t.key)))
            .collect();
        self.expand(class, &selected)
    }

    /// Expand a single target.
    pub fn render(&self, class: &str, target: &str) -> Result<Outcome> {
        let target = self.platform_data(class)?.target(target)?;
        let mut report = self.expand(class, &[target])?;
        match report.results.pop() {
            Some((_, outcome)) => Ok(outcome),
            None => Err(Error::NotFound {
                kind: "target",
                key: target.key.clone(),
            }),
        }
    }

    fn expand(&self, class_key: &str, targets: &[&Target]) -> Result<ClassReport> {
        let class = self.config.class(class_key)?;
        let data = self.platform_data(class_key)?;
        let template_name = display_path(&class.template);
        let template = Template::load(&self.config.resolve(&class.template), &template_name)?;
        let renderer = render::create_renderer(class.format, class.header.then(|| template_name.clone()));

        tracing::info!(class = class_key, targets = targets.len(), "generating");
        let info = ClassInfo {
            key: class_key,
            template: &template_name,
            heading_depth: data.heading_depth(),
        };

        let results: Vec<(String, Outcome)> = targets
            .par_iter()
            .map(|target| {
                let outcome = self.expand_target(info, class, &template, renderer.as_ref(), target);
                (target.key.clone(), outcome)
            })
            .collect();

        for failure in results.iter().filter_map(|(_, o)| o.as_ref().err()) {
            tracing::warn!(
                class = class_key,
                target = %failure.target,
                errors = failure.errors.len(),
                "target failed"
            );
        }

        Ok(ClassReport {
            class: class_key.to_string(),
            results,
        })
    }

    fn expand_target(
        &self,
        info: ClassInfo<'_>,
        class: &ClassConfig,
        template: &Template,
        renderer: &dyn Renderer,
        target: &Target,
    ) -> Outcome {
        let slug = slug::slug(&target.key);
        let file = class.output_dir.join(format!("{}.{}", slug, class.extension));
        let placement = Placement {
            url: slug::url_for(&class.url_prefix, &slug),
            output_path: display_path(&file),
            slug,
        };

        let ctx = context::build(info, target, &placement);
        let doc = template
            .evaluate(&target.key, &ctx, &self.registry)
            .map_err(|errors| TargetFailure {
                target: target.key.clone(),
                errors,
            })?;

        tracing::debug!(target = %target.key, fragments = doc.fragments.len(), "expanded");
        let text = renderer.render(&doc).map_err(|e| TargetFailure {
            target: target.key.clone(),
            errors: vec![e],
        })?;
        Ok(RenderedDoc {
            target: target.key.clone(),
            url: placement.url,
            output_path: self.config.resolve(&file),
            text,
        })
    }

    /// Write every rendered document, skipping files whose content is
    /// already identical. A document that cannot be written is recorded in
    /// the summary and the rest are still written.
    pub fn write(&self, report: &ClassReport) -> WriteSummary {
        let mut summary = WriteSummary::default();
        for doc in report.rendered() {
            match write_doc(doc) {
                Ok(true) => {
                    tracing::info!(path = %doc.output_path.display(), "wrote");
                    summary.written += 1;
                }
                Ok(false) => {
                    tracing::debug!(path = %doc.output_path.display(), "unchanged");
                    summary.unchanged += 1;
                }
                Err(e) => {
                    tracing::warn!(target = %doc.target, "{}", e);
                    summary.failures.push(TargetFailure {
                        target: doc.target.clone(),
                        errors: vec![e],
                    });
                }
            }
        }
        summary
    }

    /// Documents whose file on disk differs from what would be written.
    pub fn check(&self, report: &ClassReport) -> Vec<StaleDoc> {
        let mut stale = Vec::new();
        for doc in report.rendered() {
            let reason = match read_existing(&doc.output_path) {
                Ok(None) => Staleness::Missing,
                Ok(Some(existing)) if existing != doc.text => Staleness::Outdated,
                Ok(Some(_)) => continue,
                Err(e) => {
                    tracing::warn!(target = %doc.target, "{}", e);
                    Staleness::Unreadable
                }
            };
            stale.push(StaleDoc {
                target: doc.target.clone(),
                path: doc.output_path.clone(),
                reason,
            });
        }
        stale
    }

    fn platform_data(&self, class: &str) -> Result<&PlatformData> {
        self.platforms.get(class).ok_or_else(|| Error::NotFound {
            kind: "template class",
            key: class.to_string(),
        })
    }
}

/// Every key needs a non-empty slug, and two keys may not collapse to the
/// same output file.
fn check_slugs(data: &PlatformData) -> Result<()> {
    let mut seen: HashMap<String, &str> = HashMap::new();
    for target in data.targets() {
        let slug = slug::slug(&target.key);
        if slug.is_empty() {
            return Err(Error::InvalidData {
                path: data.path().to_path_buf(),
                message: format!(
                    "target '{}' has no characters usable in a file name",
                    target.key
                ),
            });
        }
        if let Some(other) = seen.insert(slug, &target.key) {
            return Err(Error::InvalidData {
                path: data.path().to_path_buf(),
                message: format!(
                    "targets '{}' and '{}' map to the same output file",
                    other, target.key
                ),
            });
        }
    }
    Ok(())
}

/// Returns whether the file was (re)written.
fn write_doc(doc: &RenderedDoc) -> Result<bool> {
    if read_existing(&doc.output_path)?.as_deref() == Some(doc.text.as_str()) {
        return Ok(false);
    }
    if let Some(parent) = doc.output_path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    fs::write(&doc.output_path, &doc.text).map_err(|e| Error::io(&doc.output_path, e))?;
    Ok(true)
}

fn read_existing(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// `/`-separated rendition of a relative path, stable across platforms.
fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
