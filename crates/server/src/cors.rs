use config::{AnyOrHttpMethodArray, AnyOrUrlArray, CorsConfig};
use http::HeaderValue;
use tower_http::cors::{AllowMethods, AllowOrigin, CorsLayer};

pub(super) fn generate(
    CorsConfig {
        allow_credentials,
        allow_origins,
        allow_methods,
        max_age,
    }: &CorsConfig,
) -> CorsLayer {
    let mut cors_layer = CorsLayer::new().allow_credentials(*allow_credentials);

    if let Some(allow_origins) = allow_origins {
        cors_layer = cors_layer.allow_origin(match allow_origins {
            AnyOrUrlArray::Any => AllowOrigin::any(),
            AnyOrUrlArray::Explicit(origins) => {
                // Browsers send the origin without a trailing slash, while `Url` always renders one.
                let origins = origins.iter().filter_map(|origin| {
                    let origin = &origin[..url::Position::BeforePath];

                    match HeaderValue::from_str(origin) {
                        Ok(value) => Some(value),
                        Err(e) => {
                            log::warn!("Ignoring CORS origin '{origin}': {e}");
                            None
                        }
                    }
                });

                AllowOrigin::list(origins)
            }
        });
    }

    if let Some(max_age) = max_age {
        cors_layer = cors_layer.max_age(*max_age);
    }

    if let Some(allow_methods) = allow_methods {
        cors_layer = cors_layer.allow_methods(match allow_methods {
            AnyOrHttpMethodArray::Any => AllowMethods::any(),
            AnyOrHttpMethodArray::Explicit(methods) => {
                let mut methods: Vec<http::Method> = methods.iter().map(|method| http::Method::from(*method)).collect();
                // Always include OPTIONS when explicit methods are configured
                if !methods.contains(&http::Method::OPTIONS) {
                    methods.push(http::Method::OPTIONS);
                }
                AllowMethods::list(methods)
            }
        });
    }

    cors_layer
}
