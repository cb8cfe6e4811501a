use std::fmt::Debug;
use std::path::Path;

use minijinja::{path_loader, Environment};
use serde_json::Value;

use crate::error::Result;
use crate::snapshot::Metadata;

/// A template engine. The templating stage renders through this seam, so
/// another engine can stand in without touching the pipeline.
pub trait Engine: Debug {
    /// Render the named template against a JSON-like context.
    fn render(&self, name: &str, context: &Value) -> Result<String>;
}

/// The stock engine: minijinja, with templates loaded from a directory.
#[derive(Debug)]
pub struct MiniJinjaEngine {
    env: Environment<'static>,
}

impl MiniJinjaEngine {
    /// An engine loading templates from `templates`, with `globals` exposed
    /// to every template as `G`.
    pub fn new<P: AsRef<Path>>(templates: Option<P>, globals: &Metadata) -> Self {
        let mut env = Environment::new();
        if let Some(templates) = templates {
            env.set_loader(path_loader(templates));
        }

        env.add_global("G", minijinja::Value::from_serialize(globals));
        env.add_filter("date", ext::date);
        env.add_filter("deslug", ext::deslug);
        env.add_function("now", ext::now);
        MiniJinjaEngine { env }
    }
}

impl Engine for MiniJinjaEngine {
    fn render(&self, name: &str, context: &Value) -> Result<String> {
        let template = self.env.get_template(name)?;
        Ok(template.render(minijinja::Value::from_serialize(context))?)
    }
}

mod ext {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
    use minijinja::value::Value;
    use minijinja::{Error, ErrorKind};

    pub fn deslug(value: &str) -> String {
        value.replace('-', " ")
    }

    pub fn date(value: Value, fmt: &str) -> Result<Value, Error> {
        if let Ok(ts) = i64::try_from(value.clone()) {
            let datetime = DateTime::from_timestamp(ts, 0)
                .ok_or_else(|| Error::new(
                    ErrorKind::InvalidOperation,
                    "invalid timestamp provided to `date`"
                ))?;

            return Ok(datetime.format(fmt).to_string().into());
        }

        let kind = value.kind();
        let attr = value.get_attr("$__toml_private_datetime")
            .ok()
            .filter(|v| !v.is_undefined());

        let string = match attr.as_ref() {
            Some(datetime) => datetime.as_str(),
            None => value.as_str(),
        }.ok_or_else(|| Error::new(
            ErrorKind::InvalidOperation,
            format!("`date` must be applied to a string or integer, found {kind}")
        ))?;

        let formatted = string.parse::<NaiveDate>().map(|d| d.format(fmt))
            .or_else(|_| string.parse::<NaiveTime>().map(|t| t.format(fmt)))
            .or_else(|_| string.parse::<NaiveDateTime>().map(|dt| dt.format(fmt)))
            .or_else(|_| string.parse::<DateTime<Utc>>().map(|dt| dt.format(fmt)))
            .map_err(|e| Error::new(
                ErrorKind::InvalidOperation,
                format!("failed to parse {string}: {e}")
            ))?;

        Ok(formatted.to_string().into())
    }

    pub fn now() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::SystemTime::UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0)
    }
}
