//! Metrics queries issued by the scalers.

/// In-flight requests across all replicas of a function (gauge).
pub fn in_flight(name: &str, namespace: &str) -> String {
    format!(
        "sum(http_requests_in_flight{{faas_function=\"{name}\",kubernetes_namespace=\"{namespace}\"}}) by (faas_function,kubernetes_namespace)"
    )
}

/// Cumulative invocation count of a function (counter).
pub fn invocations_total(name: &str, namespace: &str) -> String {
    format!("sum(gateway_function_invocation_total{{function_name=\"{name}.{namespace}\"}}) by (function_name)")
}

/// Cumulative seconds spent serving successful requests (counter).
pub fn request_duration_sum(name: &str) -> String {
    format!("sum(http_request_duration_seconds_sum{{status=\"200\",path=\"/system/function/{name}\"}})")
}

/// Cumulative successful invocations of a function (counter).
pub fn success_total(name: &str, namespace: &str) -> String {
    format!("sum(gateway_function_invocation_total{{function_name=\"{name}.{namespace}\",code=\"200\"}})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_flight_query_selects_function_and_namespace() {
        assert_eq!(
            in_flight("figlet", "openfaas-fn"),
            "sum(http_requests_in_flight{faas_function=\"figlet\",kubernetes_namespace=\"openfaas-fn\"}) by (faas_function,kubernetes_namespace)"
        );
    }

    #[test]
    fn invocation_queries_use_dotted_function_name() {
        assert!(invocations_total("figlet", "openfaas-fn").contains("function_name=\"figlet.openfaas-fn\""));
        assert!(success_total("figlet", "openfaas-fn").contains("code=\"200\""));
        assert!(request_duration_sum("figlet").contains("path=\"/system/function/figlet\""));
    }
}
