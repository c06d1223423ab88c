//! Kubernetes tools backed by PromQL
//!
//! Every tool here has the same shape: read a few optional label filters and
//! a limit, render one PromQL expression, and run it as an instant query.
//! Each one is a [`PromQlTool`] driven by a static [`QueryDef`].

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::tool::{RequiredPermissions, Tool, ToolResult};
use crate::auth::CallContext;
use crate::remote::{PromQuery, RemoteClient};

const METRICS_PERMISSION: &str = "metrics-data.read";
const DEFAULT_INTERVAL: &str = "1h";
const WORKLOAD_STATUSES: &[&str] = &["desired", "ready", "running", "unavailable"];

/// One string argument a tool accepts
#[derive(Debug, Clone, Copy)]
struct Param {
    name: &'static str,
    description: &'static str,
    choices: &'static [&'static str],
    required: bool,
}

impl Param {
    const fn optional(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            choices: &[],
            required: false,
        }
    }
}

const CLUSTER: Param = Param::optional("cluster_name", "The name of the cluster to filter by.");
const NAMESPACE: Param = Param::optional("namespace_name", "The name of the namespace to filter by.");
const WORKLOAD_TYPE: Param = Param::optional("workload_type", "The type of the workload to filter by.");
const WORKLOAD_NAME: Param = Param::optional("workload_name", "The name of the workload to filter by.");
const POD: Param = Param::optional("pod_name", "The name of the pod to filter by.");
const NODE: Param = Param::optional("node_name", "The name of the node to filter by.");
const INTERVAL: Param = Param::optional(
    "interval",
    "Time interval for the query (e.g. '1h', '30m'). Default is '1h'.",
);

/// `(argument, label, operator)`
type LabelFilter = (&'static str, &'static str, &'static str);

const CLUSTER_SCOPE: &[LabelFilter] = &[
    ("cluster_name", "kube_cluster_name", "="),
    ("namespace_name", "kube_namespace_name", "="),
];
const WORKLOAD_SCOPE: &[LabelFilter] = &[
    ("cluster_name", "kube_cluster_name", "="),
    ("namespace_name", "kube_namespace_name", "="),
    ("workload_type", "kube_workload_type", "="),
    ("workload_name", "kube_workload_name", "="),
];

/// Static description of one PromQL tool
struct QueryDef {
    name: &'static str,
    description: &'static str,
    params: &'static [Param],
    limit_description: &'static str,
    default_limit: u32,
    permissions: &'static [&'static str],
    failure: &'static str,
    build: fn(&QueryArgs<'_>) -> Result<String, String>,
}

/// Arguments of one call; blank strings count as absent
struct QueryArgs<'a> {
    values: &'a Map<String, Value>,
    limit: u32,
}

impl<'a> QueryArgs<'a> {
    fn new(values: &'a Map<String, Value>, default_limit: u32) -> Result<Self, String> {
        let limit = match values.get("limit") {
            None | Some(Value::Null) => default_limit,
            Some(value) => value
                .as_u64()
                .or_else(|| value.as_f64().filter(|n| *n >= 0.0 && n.fract() == 0.0).map(|n| n as u64))
                .map(|n| n.min(u64::from(u32::MAX)) as u32)
                .ok_or_else(|| format!("limit must be a non-negative integer, found {}", value))?,
        };
        Ok(Self { values, limit })
    }

    fn get(&self, name: &str) -> Option<&'a str> {
        self.values
            .get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    /// Render the filters whose argument is present, in order
    fn filters(&self, labels: &[LabelFilter]) -> Vec<String> {
        labels
            .iter()
            .filter_map(|(arg, label, op)| {
                self.get(arg)
                    .map(|value| format!("{}{}\"{}\"", label, op, escape(value)))
            })
            .collect()
    }
}

/// Escape a value for a double-quoted PromQL string
fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// `metric{a="1",b="2"}`, or the bare metric without filters
fn selector(metric: &str, filters: &[String], separator: &str) -> String {
    if filters.is_empty() {
        metric.to_string()
    } else {
        format!("{}{{{}}}", metric, filters.join(separator))
    }
}

/// Seconds in a duration such as `1h`, `30m`, `1h30m` or `1.5h`
fn parse_interval(text: &str) -> Result<f64, String> {
    let invalid = || format!("invalid interval format: '{}'", text);
    if text == "0" {
        return Ok(0.0);
    }
    if text.is_empty() {
        return Err(invalid());
    }

    let mut rest = text;
    let mut seconds = 0.0;
    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let number: f64 = rest[..number_end].parse().map_err(|_| invalid())?;
        rest = &rest[number_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_end] {
            "ns" => 1e-9,
            "us" | "µs" | "μs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3_600.0,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_end..];
        seconds += number * scale;
    }
    Ok(seconds)
}

fn clusters(args: &QueryArgs<'_>) -> Result<String, String> {
    let filters = args.filters(&[("cluster_name", "cluster", "=")]);
    Ok(selector("kube_cluster_info", &filters, ","))
}

fn nodes(args: &QueryArgs<'_>) -> Result<String, String> {
    let filters = args.filters(&[
        ("cluster_name", "cluster", "="),
        ("node_name", "kube_node_name", "="),
    ]);
    Ok(selector("kube_node_info", &filters, ","))
}

fn cronjobs(args: &QueryArgs<'_>) -> Result<String, String> {
    let filters = args.filters(&[
        ("cluster_name", "kube_cluster_name", "="),
        ("namespace_name", "kube_namespace_name", "="),
        ("cronjob_name", "kube_cronjob_name", "="),
    ]);
    Ok(selector("kube_cronjob_info", &filters, ","))
}

fn workloads(args: &QueryArgs<'_>) -> Result<String, String> {
    // The status becomes part of the metric name, so only known values pass
    let status = args
        .get("status")
        .filter(|s| WORKLOAD_STATUSES.contains(s))
        .ok_or_else(|| format!("status must be one of: {}", WORKLOAD_STATUSES.join(", ")))?;
    let filters = args.filters(&[
        ("cluster_name", "kube_cluster_name", "="),
        ("namespace_name", "kube_namespace_name", "="),
        ("workload_name", "kube_workload_name", "="),
        ("workload_type", "kube_workload_type", "="),
    ]);
    Ok(selector(&format!("kube_workload_status_{}", status), &filters, ","))
}

fn pod_containers(args: &QueryArgs<'_>) -> Result<String, String> {
    let mut labels = WORKLOAD_SCOPE.to_vec();
    labels.extend_from_slice(&[
        ("pod_name", "kube_pod_name", "="),
        ("container_name", "kube_pod_container_name", "="),
        ("image_pullstring", "image", "="),
        ("node_name", "kube_node_name", "="),
    ]);
    Ok(selector("kube_pod_container_info", &args.filters(&labels), ","))
}

fn top_unavailable_pods(args: &QueryArgs<'_>) -> Result<String, String> {
    let common = args.filters(WORKLOAD_SCOPE);
    let mut ready = vec!["kube_workload_type!=\"daemonset\"".to_string()];
    ready.extend(common.iter().cloned());
    let common = common.join(",");

    Ok(format!(
        r#"topk (
  {limit},
    (
      sum by (kube_cluster_name, kube_namespace_name, kube_workload_name) (
        kube_workload_status_desired{{{common}}}
      )
    )
  -
      (
          sum by (kube_cluster_name, kube_namespace_name, kube_workload_name) (
              kube_workload_status_ready{{{ready}}}
            or
              kube_daemonset_status_number_ready{{{common}}}
          )
        or
          vector(0)
      )
    >
      0 or vector(0)
)"#,
        limit = args.limit,
        common = common,
        ready = ready.join(","),
    ))
}

fn top_restarted_pods(args: &QueryArgs<'_>) -> Result<String, String> {
    let mut labels = WORKLOAD_SCOPE.to_vec();
    labels.push(("pod_name", "kube_pod_name", "="));
    Ok(format!(
        "topk({}, sum by(pod, kube_cluster_name, kube_namespace_name) ({}) > 0)",
        args.limit,
        selector("kube_pod_container_status_restarts_total", &args.filters(&labels), ",")
    ))
}

fn top_errors_in_pods(args: &QueryArgs<'_>, metric: &str) -> Result<String, String> {
    let interval = args.get("interval").unwrap_or(DEFAULT_INTERVAL);
    let seconds = parse_interval(interval)?;
    let filters = args.filters(&[
        ("cluster_name", "kube_cluster_name", "=~"),
        ("namespace_name", "kube_namespace_name", "="),
        ("workload_type", "kube_workload_type", "="),
        ("workload_name", "kube_workload_name", "="),
    ]);
    Ok(format!(
        "topk({},sum(sum_over_time({}{{{}}}[{}])) by (kube_cluster_name, kube_namespace_name, kube_workload_type, kube_workload_name, kube_pod_name)) / {:.6}",
        args.limit,
        metric,
        filters.join(","),
        interval,
        seconds
    ))
}

fn top_http_errors_in_pods(args: &QueryArgs<'_>) -> Result<String, String> {
    top_errors_in_pods(args, "sysdig_container_net_http_error_count")
}

fn top_network_errors_in_pods(args: &QueryArgs<'_>) -> Result<String, String> {
    top_errors_in_pods(args, "sysdig_container_net_error_count")
}

fn count_pods_per_cluster(args: &QueryArgs<'_>) -> Result<String, String> {
    Ok(format!(
        "sum by (kube_cluster_name, kube_namespace_name) ({})",
        selector("kube_pod_info", &args.filters(CLUSTER_SCOPE), ",")
    ))
}

fn underutilized_pods(args: &QueryArgs<'_>, used: &str, limit: &str) -> Result<String, String> {
    let filters = args.filters(CLUSTER_SCOPE);
    Ok(format!(
        "sum by (kube_cluster_name, kube_namespace_name, kube_pod_name)({}) / (sum by (kube_cluster_name, kube_namespace_name, kube_pod_name)({}) > 0) < 0.25",
        selector(used, &filters, ","),
        selector(limit, &filters, ",")
    ))
}

fn underutilized_pods_cpu_quota(args: &QueryArgs<'_>) -> Result<String, String> {
    underutilized_pods(
        args,
        "sysdig_container_cpu_cores_used",
        "sysdig_container_cpu_cores_quota_limit",
    )
}

fn underutilized_pods_by_memory_quota(args: &QueryArgs<'_>) -> Result<String, String> {
    underutilized_pods(
        args,
        "sysdig_container_memory_used_bytes",
        "sysdig_container_memory_limit_bytes",
    )
}

fn top_cpu_consumed_workload(args: &QueryArgs<'_>) -> Result<String, String> {
    Ok(format!(
        "topk({}, sum by (kube_cluster_name, kube_namespace_name, kube_workload_type, kube_workload_name)({}))",
        args.limit,
        selector("sysdig_container_cpu_cores_used", &args.filters(WORKLOAD_SCOPE), ",")
    ))
}

fn top_cpu_consumed_container(args: &QueryArgs<'_>) -> Result<String, String> {
    Ok(format!(
        "topk({}, sum by (kube_cluster_name, kube_namespace_name, kube_workload_type, kube_workload_name, container_label_io_kubernetes_container_name)({}))",
        args.limit,
        selector("sysdig_container_cpu_cores_used", &args.filters(WORKLOAD_SCOPE), ",")
    ))
}

fn top_memory_consumed_by_workload(args: &QueryArgs<'_>) -> Result<String, String> {
    Ok(format!(
        "topk({}, sum by (kube_cluster_name, kube_namespace_name, kube_workload_type, kube_workload_name) ({}))",
        args.limit,
        selector("sysdig_container_memory_used_bytes", &args.filters(WORKLOAD_SCOPE), ",")
    ))
}

fn top_memory_consumed_by_container(args: &QueryArgs<'_>) -> Result<String, String> {
    Ok(format!(
        "topk({}, sum by (kube_cluster_name, kube_namespace_name, kube_workload_type, kube_workload_name, container_label_io_kubernetes_container_name) ({}))",
        args.limit,
        selector("sysdig_container_memory_used_bytes", &args.filters(WORKLOAD_SCOPE), ", ")
    ))
}

/// Every PromQL tool, in registration order
static QUERY_TOOLS: &[QueryDef] = &[
    QueryDef {
        name: "kubernetes_list_clusters",
        description: "Lists the cluster information for all clusters or just the cluster specified.",
        params: &[CLUSTER],
        limit_description: "Maximum number of clusters to return.",
        default_limit: 10,
        permissions: &[METRICS_PERMISSION],
        failure: "failed to get cluster list",
        build: clusters,
    },
    QueryDef {
        name: "kubernetes_list_nodes",
        description: "Lists the information from all nodes, all nodes from a cluster or a specific node with some name.",
        params: &[CLUSTER, NODE],
        limit_description: "Maximum number of nodes to return.",
        default_limit: 10,
        permissions: &[],
        failure: "failed to get node list",
        build: nodes,
    },
    QueryDef {
        name: "kubernetes_list_cronjobs",
        description: "Retrieves information from the cronjobs in the cluster.",
        params: &[
            CLUSTER,
            NAMESPACE,
            Param::optional("cronjob_name", "The name of the cronjob to filter by."),
        ],
        limit_description: "Maximum number of cronjobs to return.",
        default_limit: 10,
        permissions: &[],
        failure: "failed to get cronjob list",
        build: cronjobs,
    },
    QueryDef {
        name: "kubernetes_list_workloads",
        description: "Lists all the workloads that are in a particular state, desired, ready, running or unavailable. Results can be filtered by cluster, namespace, workload name or type.",
        params: &[
            Param {
                name: "status",
                description: "The status of the workload.",
                choices: WORKLOAD_STATUSES,
                required: true,
            },
            CLUSTER,
            NAMESPACE,
            Param::optional("workload_name", "The name of the workload to filter by."),
            Param {
                name: "workload_type",
                description: "The type of the workload.",
                choices: &["deployment", "daemonset", "statefulset"],
                required: false,
            },
        ],
        limit_description: "Maximum number of workloads to return.",
        default_limit: 10,
        permissions: &[],
        failure: "failed to get workload list",
        build: workloads,
    },
    QueryDef {
        name: "kubernetes_list_pod_containers",
        description: "Retrieves information from a particular pod and container.",
        params: &[
            CLUSTER,
            NAMESPACE,
            WORKLOAD_TYPE,
            WORKLOAD_NAME,
            POD,
            Param::optional("container_name", "The name of the container to filter by."),
            Param::optional("image_pullstring", "The image pullstring to filter by."),
            NODE,
        ],
        limit_description: "Maximum number of pod containers to return.",
        default_limit: 10,
        permissions: &[METRICS_PERMISSION],
        failure: "failed to get pod container list",
        build: pod_containers,
    },
    QueryDef {
        name: "troubleshoot_kubernetes_list_top_unavailable_pods",
        description: "Shows the top N pods with the highest number of unavailable or unready replicas in a Kubernetes cluster, ordered from highest to lowest.",
        params: &[CLUSTER, NAMESPACE, WORKLOAD_TYPE, WORKLOAD_NAME],
        limit_description: "Maximum number of pods to return.",
        default_limit: 20,
        permissions: &[],
        failure: "failed to get top unavailable pods",
        build: top_unavailable_pods,
    },
    QueryDef {
        name: "k8s_list_top_restarted_pods",
        description: "Lists the pods with the highest number of container restarts in the specified scope (cluster, namespace, workload, or individual pod). By default, it returns the top 10.",
        params: &[CLUSTER, NAMESPACE, WORKLOAD_TYPE, WORKLOAD_NAME, POD],
        limit_description: "Maximum number of pods to return.",
        default_limit: 10,
        permissions: &[METRICS_PERMISSION],
        failure: "failed to get top restarted pods",
        build: top_restarted_pods,
    },
    QueryDef {
        name: "kubernetes_list_top_http_errors_in_pods",
        description: "Lists the pods with the highest rate of HTTP 4xx and 5xx errors over a specified time interval, allowing filtering by cluster, namespace, workload type, and workload name.",
        params: &[INTERVAL, CLUSTER, NAMESPACE, WORKLOAD_TYPE, WORKLOAD_NAME],
        limit_description: "Maximum number of pods to return.",
        default_limit: 20,
        permissions: &[METRICS_PERMISSION],
        failure: "failed to execute query",
        build: top_http_errors_in_pods,
    },
    QueryDef {
        name: "k8s_list_top_network_errors_in_pods",
        description: "Shows the top network errors by pod over a given interval, aggregated by cluster, namespace, workload type, and workload name. The result is an average rate of network errors per second.",
        params: &[INTERVAL, CLUSTER, NAMESPACE, WORKLOAD_TYPE, WORKLOAD_NAME],
        limit_description: "Maximum number of pods to return.",
        default_limit: 20,
        permissions: &[METRICS_PERMISSION],
        failure: "failed to execute query",
        build: top_network_errors_in_pods,
    },
    QueryDef {
        name: "troubleshoot_kubernetes_list_count_pods_per_cluster",
        description: "List the count of running Kubernetes Pods grouped by cluster and namespace.",
        params: &[CLUSTER, NAMESPACE],
        limit_description: "Maximum number of results to return.",
        default_limit: 20,
        permissions: &[],
        failure: "failed to count pods per cluster",
        build: count_pods_per_cluster,
    },
    QueryDef {
        name: "kubernetes_list_underutilized_pods_cpu_quota",
        description: "List Kubernetes pods with CPU usage below 25% of the quota limit.",
        params: &[CLUSTER, NAMESPACE],
        limit_description: "Maximum number of pods to return.",
        default_limit: 10,
        permissions: &[METRICS_PERMISSION],
        failure: "failed to get underutilized pods",
        build: underutilized_pods_cpu_quota,
    },
    QueryDef {
        name: "k8s_list_top_cpu_consumed_workload",
        description: "Identifies the Kubernetes workloads (all containers) consuming the most CPU (in cores).",
        params: &[CLUSTER, NAMESPACE, WORKLOAD_TYPE, WORKLOAD_NAME],
        limit_description: "Maximum number of workloads to return.",
        default_limit: 20,
        permissions: &[METRICS_PERMISSION],
        failure: "failed to get top CPU consumed workloads",
        build: top_cpu_consumed_workload,
    },
    QueryDef {
        name: "kubernetes_list_top_cpu_consumed_container",
        description: "Identifies the Kubernetes containers consuming the most CPU (in cores).",
        params: &[CLUSTER, NAMESPACE, WORKLOAD_TYPE, WORKLOAD_NAME],
        limit_description: "Maximum number of containers to return.",
        default_limit: 20,
        permissions: &[METRICS_PERMISSION],
        failure: "failed to get top CPU consumed containers",
        build: top_cpu_consumed_container,
    },
    QueryDef {
        name: "troubleshoot_kubernetes_list_underutilized_pods_by_memory_quota",
        description: "List Kubernetes pods with memory usage below 25% of the limit.",
        params: &[CLUSTER, NAMESPACE],
        limit_description: "Maximum number of pods to return.",
        default_limit: 10,
        permissions: &[],
        failure: "failed to get underutilized pods",
        build: underutilized_pods_by_memory_quota,
    },
    QueryDef {
        name: "troubleshoot_kubernetes_list_top_memory_consumed_by_workload",
        description: "Lists memory-intensive workloads (all containers).",
        params: &[CLUSTER, NAMESPACE, WORKLOAD_TYPE, WORKLOAD_NAME],
        limit_description: "Maximum number of workloads to return.",
        default_limit: 20,
        permissions: &[],
        failure: "failed to get top memory consumed workloads",
        build: top_memory_consumed_by_workload,
    },
    QueryDef {
        name: "troubleshoot_kubernetes_list_top_memory_consumed_by_container",
        description: "Lists memory-intensive containers.",
        params: &[CLUSTER, NAMESPACE, WORKLOAD_TYPE, WORKLOAD_NAME],
        limit_description: "Maximum number of containers to return.",
        default_limit: 20,
        permissions: &[],
        failure: "failed to get top memory consumed containers",
        build: top_memory_consumed_by_container,
    },
];

/// Runs one PromQL query shape against the remote API
pub struct PromQlTool {
    def: &'static QueryDef,
    client: Arc<RemoteClient>,
}

impl PromQlTool {
    /// Every Kubernetes tool bound to `client`
    pub fn all(client: Arc<RemoteClient>) -> Vec<Self> {
        QUERY_TOOLS
            .iter()
            .map(|def| Self {
                def,
                client: client.clone(),
            })
            .collect()
    }

    /// The tool called `name`, if there is one
    pub fn named(name: &str, client: Arc<RemoteClient>) -> Option<Self> {
        QUERY_TOOLS
            .iter()
            .find(|def| def.name == name)
            .map(|def| Self { def, client })
    }

    fn query(&self, input: &Value) -> Result<PromQuery, String> {
        let empty = Map::new();
        let values = match input {
            Value::Object(values) => values,
            Value::Null => &empty,
            other => return Err(format!("arguments must be an object, found {}", other)),
        };
        let args = QueryArgs::new(values, self.def.default_limit)?;
        let query = (self.def.build)(&args)?;
        Ok(PromQuery {
            query,
            limit: args.limit,
        })
    }
}

#[async_trait]
impl Tool for PromQlTool {
    fn name(&self) -> &str {
        self.def.name
    }

    fn description(&self) -> &str {
        self.def.description
    }

    fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in self.def.params {
            let mut property = json!({
                "type": "string",
                "description": param.description
            });
            if !param.choices.is_empty() {
                property["enum"] = json!(param.choices);
            }
            properties.insert(param.name.to_string(), property);
        }
        properties.insert(
            "limit".to_string(),
            json!({
                "type": "integer",
                "description": self.def.limit_description,
                "default": self.def.default_limit
            }),
        );

        let required: Vec<&str> = self
            .def
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();

        let mut schema = json!({ "type": "object", "properties": properties });
        if !required.is_empty() {
            schema["required"] = json!(required);
        }
        schema
    }

    fn required_permissions(&self) -> RequiredPermissions {
        RequiredPermissions::of(self.def.permissions.iter().copied())
    }

    async fn execute(&self, ctx: &CallContext, input: &Value) -> Result<ToolResult> {
        let query = match self.query(input) {
            Ok(query) => query,
            Err(message) => return Ok(ToolResult::error(message)),
        };
        tracing::debug!("[{}] PromQL: {}", self.def.name, query.query);

        match self.client.query_prometheus(ctx, &query).await {
            Ok(result) => Ok(ToolResult::json(result)),
            Err(e) => Ok(ToolResult::error(format!("{}: {}", self.def.failure, e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::CredentialResolver;

    fn tool(name: &str) -> PromQlTool {
        let client = RemoteClient::new(CredentialResolver::new()).unwrap();
        PromQlTool::named(name, Arc::new(client)).unwrap()
    }

    fn query(name: &str, input: Value) -> PromQuery {
        tool(name).query(&input).unwrap()
    }

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<_> = QUERY_TOOLS.iter().map(|d| d.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), QUERY_TOOLS.len());
    }

    #[test]
    fn test_clusters_without_filter() {
        let query = query("kubernetes_list_clusters", Value::Null);
        assert_eq!(query.query, "kube_cluster_info");
        assert_eq!(query.limit, 10);
    }

    #[test]
    fn test_filter_values_are_escaped() {
        let query = query(
            "kubernetes_list_clusters",
            json!({"cluster_name": "prod\"x", "limit": 3}),
        );
        assert_eq!(query.query, "kube_cluster_info{cluster=\"prod\\\"x\"}");
        assert_eq!(query.limit, 3);
    }

    #[test]
    fn test_nodes_join_filters_in_order() {
        let query = query(
            "kubernetes_list_nodes",
            json!({"node_name": "n1", "cluster_name": "c1"}),
        );
        assert_eq!(query.query, "kube_node_info{cluster=\"c1\",kube_node_name=\"n1\"}");
    }

    #[test]
    fn test_blank_filters_are_ignored() {
        let query = query(
            "kubernetes_list_cronjobs",
            json!({"cluster_name": "  ", "cronjob_name": "backup"}),
        );
        assert_eq!(query.query, "kube_cronjob_info{kube_cronjob_name=\"backup\"}");
    }

    #[test]
    fn test_workloads_require_known_status() {
        let query = query(
            "kubernetes_list_workloads",
            json!({"status": "ready", "workload_type": "deployment"}),
        );
        assert_eq!(
            query.query,
            "kube_workload_status_ready{kube_workload_type=\"deployment\"}"
        );

        let tool = tool("kubernetes_list_workloads");
        assert!(tool.query(&json!({})).is_err());
        assert!(tool.query(&json!({"status": "ready}) or vector(1"})).is_err());
    }

    #[test]
    fn test_pod_containers_map_image_label() {
        let query = query(
            "kubernetes_list_pod_containers",
            json!({"pod_name": "p", "image_pullstring": "nginx:1"}),
        );
        assert_eq!(
            query.query,
            "kube_pod_container_info{kube_pod_name=\"p\",image=\"nginx:1\"}"
        );
    }

    #[test]
    fn test_top_restarted_pods() {
        let query = query("k8s_list_top_restarted_pods", json!({"namespace_name": "ns"}));
        assert_eq!(
            query.query,
            "topk(10, sum by(pod, kube_cluster_name, kube_namespace_name) (kube_pod_container_status_restarts_total{kube_namespace_name=\"ns\"}) > 0)"
        );
    }

    #[test]
    fn test_http_errors_default_interval() {
        let query = query(
            "kubernetes_list_top_http_errors_in_pods",
            json!({"cluster_name": "demo"}),
        );
        assert_eq!(
            query.query,
            "topk(20,sum(sum_over_time(sysdig_container_net_http_error_count{kube_cluster_name=~\"demo\"}[1h])) by (kube_cluster_name, kube_namespace_name, kube_workload_type, kube_workload_name, kube_pod_name)) / 3600.000000"
        );
        assert_eq!(query.limit, 20);
    }

    #[test]
    fn test_network_errors_custom_interval() {
        let query = query(
            "k8s_list_top_network_errors_in_pods",
            json!({"interval": "30m", "limit": 5}),
        );
        assert_eq!(
            query.query,
            "topk(5,sum(sum_over_time(sysdig_container_net_error_count{}[30m])) by (kube_cluster_name, kube_namespace_name, kube_workload_type, kube_workload_name, kube_pod_name)) / 1800.000000"
        );
    }

    #[test]
    fn test_invalid_interval_is_rejected() {
        let err = tool("k8s_list_top_network_errors_in_pods")
            .query(&json!({"interval": "1h]) or vector(1"}))
            .unwrap_err();
        assert!(err.contains("invalid interval format"));
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("1h30m").unwrap(), 5_400.0);
        assert_eq!(parse_interval("1.5h").unwrap(), 5_400.0);
        assert_eq!(parse_interval("1m30s").unwrap(), 90.0);
        assert_eq!(parse_interval("0").unwrap(), 0.0);
        assert!(parse_interval("").is_err());
        assert!(parse_interval("10").is_err());
        assert!(parse_interval("5d").is_err());
    }

    #[test]
    fn test_underutilized_memory_repeats_filters() {
        let query = query(
            "troubleshoot_kubernetes_list_underutilized_pods_by_memory_quota",
            json!({"cluster_name": "c"}),
        );
        assert_eq!(
            query.query,
            "sum by (kube_cluster_name, kube_namespace_name, kube_pod_name)(sysdig_container_memory_used_bytes{kube_cluster_name=\"c\"}) / (sum by (kube_cluster_name, kube_namespace_name, kube_pod_name)(sysdig_container_memory_limit_bytes{kube_cluster_name=\"c\"}) > 0) < 0.25"
        );
    }

    #[test]
    fn test_memory_by_container_uses_spaced_separator() {
        let query = query(
            "troubleshoot_kubernetes_list_top_memory_consumed_by_container",
            json!({"cluster_name": "c", "namespace_name": "n"}),
        );
        assert!(query
            .query
            .ends_with("(sysdig_container_memory_used_bytes{kube_cluster_name=\"c\", kube_namespace_name=\"n\"}))"));
    }

    #[test]
    fn test_unavailable_pods_excludes_daemonsets_from_ready() {
        let query = query(
            "troubleshoot_kubernetes_list_top_unavailable_pods",
            json!({"cluster_name": "c"}),
        );
        assert!(query.query.starts_with("topk (\n  20,"));
        assert!(query
            .query
            .contains("kube_workload_status_desired{kube_cluster_name=\"c\"}"));
        assert!(query.query.contains(
            "kube_workload_status_ready{kube_workload_type!=\"daemonset\",kube_cluster_name=\"c\"}"
        ));
        assert!(query
            .query
            .contains("kube_daemonset_status_number_ready{kube_cluster_name=\"c\"}"));
    }

    #[test]
    fn test_limit_must_be_a_number() {
        let tool = tool("kubernetes_list_nodes");
        assert!(tool.query(&json!({"limit": "ten"})).is_err());
        assert!(tool.query(&json!({"limit": -1})).is_err());
        assert_eq!(tool.query(&json!({"limit": 7.0})).unwrap().limit, 7);
    }

    #[test]
    fn test_schema_marks_required_and_choices() {
        let schema = tool("kubernetes_list_workloads").input_schema();
        assert_eq!(schema["required"], json!(["status"]));
        assert_eq!(
            schema["properties"]["status"]["enum"],
            json!(["desired", "ready", "running", "unavailable"])
        );
        assert_eq!(schema["properties"]["limit"]["default"], 10);
        assert!(tool("kubernetes_list_nodes").input_schema().get("required").is_none());
    }

    #[test]
    fn test_declared_permissions() {
        assert_eq!(
            tool("kubernetes_list_pod_containers").required_permissions(),
            RequiredPermissions::of([METRICS_PERMISSION])
        );
        assert_eq!(
            tool("kubernetes_list_nodes").required_permissions(),
            RequiredPermissions::none()
        );
    }
}
