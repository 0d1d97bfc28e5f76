use std::{env, str::FromStr};

use crate::{diagnostics, format, Error};

#[derive(Debug, Default, Clone)]
pub struct Config {
    pub format: format::Config,
    pub diagnostics: diagnostics::Config,
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        let mut config = Config::default();

        read_environment(&mut config.format.host, "KIBANA_HOST")?;
        read_environment(&mut config.format.app_code, "KIBANA_APP_CODE")?;
        read_environment(&mut config.format.app_version, "KIBANA_APP_VERSION")?;

        if is_truthy("KIBANA_ENABLE_DIAGNOSTICS")? {
            config.diagnostics.min_level = diagnostics::Level::Debug;
        }

        Ok(config)
    }
}

fn is_truthy(name: impl AsRef<str>) -> Result<bool, Error> {
    match env::var(name.as_ref()) {
        // The evironment variable contains a truthy value
        Ok(ref v) if v == "True" || v == "true" => Ok(true),
        // The environment variable is not set or doesn't contain
        // a truthy value
        Ok(_) | Err(env::VarError::NotPresent) => Ok(false),
        // The environment variable is invalid
        Err(e) => Err(e)?,
    }
}

fn read_environment<T>(into: &mut T, name: impl AsRef<str>) -> Result<(), Error>
where
    T: FromStr,
    Error: From<T::Err>,
{
    match env::var(name.as_ref()) {
        // The environment variable exists, but is empty
        Ok(ref v) if v == "" => Ok(()),
        // The environment variable does not exist
        Err(env::VarError::NotPresent) => Ok(()),
        // The environment variable is invalid
        Err(e) => Err(e)?,
        // The environment variable has a value
        Ok(v) => {
            *into = T::from_str(&v)?;

            Ok(())
        }
    }
}
