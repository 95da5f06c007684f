use duration_str::deserialize_option_duration;
use std::time::Duration;
use url::Url;

/// Configuration for CORS (Cross-Origin Resource Sharing)
#[derive(Clone, Debug, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Whether credentials (cookies, authorization headers) are allowed in requests
    pub allow_credentials: bool,
    /// Origins from which we allow requests
    pub allow_origins: Option<AnyOrUrlArray>,
    /// HTTP methods allowed to the endpoints.
    pub allow_methods: Option<AnyOrHttpMethodArray>,
    /// Maximum time between OPTIONS and the next request
    #[serde(deserialize_with = "deserialize_option_duration")]
    pub max_age: Option<Duration>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_credentials: true,
            allow_origins: Some(AnyOrArray::Explicit(vec![default_frontend_origin()])),
            allow_methods: Some(AnyOrArray::Explicit(vec![HttpMethod::Get])),
            max_age: None,
        }
    }
}

impl CorsConfig {
    /// Replaces the allowed origins with a single frontend origin.
    pub fn with_origin(mut self, origin: Url) -> Self {
        self.allow_origins = Some(AnyOrArray::Explicit(vec![origin]));
        self
    }
}

fn default_frontend_origin() -> Url {
    Url::parse("http://localhost:5173").expect("static origin is a valid url")
}

/// The HTTP methods the temperature endpoints can be reached with.
#[derive(Debug, PartialEq, Clone, Copy, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// Requests a representation of the resource.
    Get,
    /// Same as GET without the response body.
    Head,
    /// Describes the communication options for the resource.
    Options,
}

impl std::str::FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            _ => Err(format!("Unsupported HTTP method: {s}")),
        }
    }
}

impl From<HttpMethod> for http::Method {
    fn from(value: HttpMethod) -> Self {
        match value {
            HttpMethod::Get => http::Method::GET,
            HttpMethod::Head => http::Method::HEAD,
            HttpMethod::Options => http::Method::OPTIONS,
        }
    }
}

/// A type alias for `AnyOrArray` specifically for `Url` types.
pub type AnyOrUrlArray = AnyOrArray<Url>;

/// A type alias for `AnyOrArray` specifically for `HttpMethod` types.
pub type AnyOrHttpMethodArray = AnyOrArray<HttpMethod>;

/// Either every value (`"*"`) or an explicit list of values.
#[derive(Clone, Debug, PartialEq)]
pub enum AnyOrArray<T> {
    /// Indicates that any value is allowed (e.g., `*`).
    Any,
    /// A specific, explicit list of allowed values.
    Explicit(Vec<T>),
}

impl<T> AnyOrArray<T> {
    /// Whether this is the `"*"` wildcard.
    pub fn is_any(&self) -> bool {
        matches!(self, AnyOrArray::Any)
    }
}

impl<'de, T> serde::Deserialize<'de> for AnyOrArray<T>
where
    T: serde::Deserialize<'de> + std::str::FromStr<Err: std::fmt::Display>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct Visitor<T>(std::marker::PhantomData<T>);

        impl<'de, T> serde::de::Visitor<'de> for Visitor<T>
        where
            T: serde::Deserialize<'de> + std::str::FromStr<Err: std::fmt::Display>,
        {
            type Value = AnyOrArray<T>;

            fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                formatter.write_str("the string \"*\", a single value or an array of values")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if value == "*" {
                    return Ok(AnyOrArray::Any);
                }

                value
                    .parse::<T>()
                    .map(|value| AnyOrArray::Explicit(vec![value]))
                    .map_err(E::custom)
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let mut values = Vec::with_capacity(seq.size_hint().unwrap_or_default());

                while let Some(value) = seq.next_element()? {
                    values.push(value);
                }

                Ok(AnyOrArray::Explicit(values))
            }
        }

        deserializer.deserialize_any(Visitor(std::marker::PhantomData))
    }
}
