use super::parsing::{
    env_optional, env_or_default, is_valid_language_name, parse_bool, parse_cors_origins,
    parse_environment, parse_executor_backend, parse_i32, parse_string_list, parse_u16,
    parse_u64, parse_usize,
};
use super::secret::load_or_create_secret_key;
use super::types::{
    ApiSettings, ConfigError, CorsSettings, DatabaseSettings, ExecutionSettings, ProblemSettings,
    RedisSettings, RuntimeSettings, SecuritySettings, ServerHost, ServerPort, ServerSettings,
    Settings, TelemetrySettings,
};

const DEFAULT_LANGUAGES: &[&str] = &["python", "java", "cpp", "c", "javascript"];

/// Path the executor posts grading results to, relative to the API prefix.
pub(crate) const CALLBACK_PATH: &str = "/executor/callback";

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("PORTAL_HOST", "0.0.0.0");
        let port = env_or_default("PORTAL_PORT", "8000");

        let environment =
            parse_environment(env_optional("PORTAL_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config =
            env_optional("PORTAL_STRICT_CONFIG").map(|value| parse_bool(&value)).unwrap_or(false)
                || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "Codelab Portal API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");
        let public_base_url = env_or_default("PUBLIC_BASE_URL", "http://localhost:8000")
            .trim_end_matches('/')
            .to_string();

        let secret_key = match env_optional("SECRET_KEY") {
            Some(value) => value,
            None => load_or_create_secret_key(),
        };
        let access_token_expire_minutes = parse_u64(
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            env_or_default("ACCESS_TOKEN_EXPIRE_MINUTES", "10080"),
        )?;
        let algorithm = env_or_default("ALGORITHM", "HS256");
        let instructor_signup_code = env_optional("INSTRUCTOR_SIGNUP_CODE");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "codelab");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "codelab_portal");
        let database_url = env_optional("DATABASE_URL");

        let redis_host = env_or_default("REDIS_HOST", "localhost");
        let redis_port = parse_u16("REDIS_PORT", env_or_default("REDIS_PORT", "6379"))?;
        let redis_db = parse_u16("REDIS_DB", env_or_default("REDIS_DB", "0"))?;
        let redis_password = env_or_default("REDIS_PASSWORD", "");

        let execution_api_url = env_or_default("EXECUTION_API_URL", "");
        let execution_api_key = env_or_default("EXECUTION_API_KEY", "");
        let execution_lambda_name = env_or_default("EXECUTION_LAMBDA_NAME", "");
        let aws_region = env_or_default("AWS_REGION", "us-east-1");
        let executor_backend = parse_executor_backend(
            env_optional("EXECUTOR_BACKEND"),
            &execution_api_url,
            &execution_lambda_name,
        )?;
        let dispatch_timeout_seconds = parse_u64(
            "EXECUTION_DISPATCH_TIMEOUT_SECONDS",
            env_or_default("EXECUTION_DISPATCH_TIMEOUT_SECONDS", "10"),
        )?;

        let supported_languages =
            parse_string_list(env_optional("SUPPORTED_LANGUAGES"), DEFAULT_LANGUAGES);
        let max_code_bytes =
            parse_usize("MAX_CODE_BYTES", env_or_default("MAX_CODE_BYTES", "65536"))?;
        let default_total_score =
            parse_i32("DEFAULT_TOTAL_SCORE", env_or_default("DEFAULT_TOTAL_SCORE", "100"))?;

        let log_level = env_or_default("PORTAL_LOG_LEVEL", "info");
        let json = env_optional("PORTAL_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str, public_base_url },
            security: SecuritySettings {
                secret_key,
                access_token_expire_minutes,
                algorithm,
                instructor_signup_code,
            },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
            },
            redis: RedisSettings {
                host: redis_host,
                port: redis_port,
                db: redis_db,
                password: redis_password,
            },
            execution: ExecutionSettings {
                backend: executor_backend,
                api_url: execution_api_url,
                api_key: execution_api_key,
                lambda_name: execution_lambda_name,
                aws_region,
                dispatch_timeout_seconds,
            },
            problems: ProblemSettings { supported_languages, max_code_bytes, default_total_score },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn security(&self) -> &SecuritySettings {
        &self.security
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn execution(&self) -> &ExecutionSettings {
        &self.execution
    }

    pub(crate) fn problems(&self) -> &ProblemSettings {
        &self.problems
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    /// Absolute URL handed to the executor for posting results back.
    pub(crate) fn callback_url(&self) -> String {
        format!("{}{}{}", self.api.public_base_url, self.api.api_v1_str, CALLBACK_PATH)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.problems.supported_languages.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "SUPPORTED_LANGUAGES",
                value: String::from("<empty>"),
            });
        }

        for language in &self.problems.supported_languages {
            if !is_valid_language_name(language) {
                return Err(ConfigError::InvalidValue {
                    field: "SUPPORTED_LANGUAGES",
                    value: language.clone(),
                });
            }
        }

        if self.problems.max_code_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "MAX_CODE_BYTES",
                value: "0".to_string(),
            });
        }

        if self.problems.default_total_score <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "DEFAULT_TOTAL_SCORE",
                value: self.problems.default_total_score.to_string(),
            });
        }

        if !self.api.public_base_url.starts_with("http://")
            && !self.api.public_base_url.starts_with("https://")
        {
            return Err(ConfigError::InvalidValue {
                field: "PUBLIC_BASE_URL",
                value: self.api.public_base_url.clone(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }
        if self.execution.api_key.is_empty() {
            return Err(ConfigError::MissingSecret("EXECUTION_API_KEY"));
        }
        match self.execution.backend {
            super::ExecutorBackend::Http if self.execution.api_url.is_empty() => {
                return Err(ConfigError::MissingSecret("EXECUTION_API_URL"));
            }
            super::ExecutorBackend::Lambda if self.execution.lambda_name.is_empty() => {
                return Err(ConfigError::MissingSecret("EXECUTION_LAMBDA_NAME"));
            }
            _ => {}
        }

        Ok(())
    }
}
