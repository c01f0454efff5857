use crate::metrics;

// JSON-RPC metrics.
metrics! {
    group: json_rpc,

    "Number of HTTP requests with JSON-RPC payloads that started."
    counter rpc_requests_started{batch},

    "Time to answer HTTP requests with JSON-RPC payloads."
    histogram_duration rpc_requests_finished{status},

    "Time to handle a single JSON-RPC call, including interception."
    histogram_duration rpc_calls_finished{method, success}
}

// Upstream node metrics.
metrics! {
    group: upstream,

    "Time to forward a JSON-RPC call to the upstream node."
    histogram_duration upstream_requests{method, success}
}

// Shadow nonce metrics.
metrics! {
    group: nonce,

    "Number of latest transaction count answers, by the source of the returned value."
    counter nonce_shadowed{outcome},

    "Number of raw transaction submissions accepted by the upstream node, by dedup outcome or `failed` when counting failed."
    counter nonce_submissions{outcome}
}
