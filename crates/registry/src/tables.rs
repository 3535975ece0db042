//! Shape tables for the built-in kinds.
//!
//! One `TypeDesc` per concrete record type reachable from a registered
//! kind. Field entries carry the document key, the Rust identifier, and the
//! structural shape; `required` mirrors non-`Option` fields of the
//! `k8s-openapi` type. Fields absent from a table are skipped by the
//! declaration encoder (with a diagnostic), never by the document encoder,
//! which works on the canonical body.

use kiln_core::{FieldDesc, ScalarKind, Shape, TypeDesc};

const CORE_V1: &str = "k8s_openapi::api::core::v1";
const APPS_V1: &str = "k8s_openapi::api::apps::v1";
const RBAC_V1: &str = "k8s_openapi::api::rbac::v1";
const META_V1: &str = "k8s_openapi::apimachinery::pkg::apis::meta::v1";

const STR: Shape = Shape::Scalar(ScalarKind::Str);
const INT: Shape = Shape::Scalar(ScalarKind::Int);
const BOOL: Shape = Shape::Scalar(ScalarKind::Bool);
const STR_LIST: Shape = Shape::Seq(&STR);
const STR_MAP: Shape = Shape::Map(&STR);
const QUANTITY_MAP: Shape = Shape::Map(&Shape::Quantity);

// ---- meta ----

pub static OBJECT_META: TypeDesc = TypeDesc::new(
    META_V1,
    "ObjectMeta",
    &[
        FieldDesc::new("name", "name", STR),
        FieldDesc::new("namespace", "namespace", STR),
        FieldDesc::new("labels", "labels", STR_MAP),
        FieldDesc::new("annotations", "annotations", STR_MAP),
        FieldDesc::new("finalizers", "finalizers", STR_LIST),
    ],
);

pub static LABEL_SELECTOR: TypeDesc = TypeDesc::new(
    META_V1,
    "LabelSelector",
    &[
        FieldDesc::new("matchLabels", "match_labels", STR_MAP),
        FieldDesc::new("matchExpressions", "match_expressions", Shape::Seq(&Shape::Record(&LABEL_SELECTOR_REQUIREMENT))),
    ],
);

pub static LABEL_SELECTOR_REQUIREMENT: TypeDesc = TypeDesc::new(
    META_V1,
    "LabelSelectorRequirement",
    &[
        FieldDesc::required("key", "key", STR),
        FieldDesc::required("operator", "operator", STR),
        FieldDesc::new("values", "values", STR_LIST),
    ],
);

// ---- core/v1 ----

pub static NAMESPACE: TypeDesc = TypeDesc::new(
    CORE_V1,
    "Namespace",
    &[
        FieldDesc::required("metadata", "metadata", Shape::Record(&OBJECT_META)),
        FieldDesc::new("spec", "spec", Shape::Optional(&Shape::Record(&NAMESPACE_SPEC))),
    ],
);

pub static NAMESPACE_SPEC: TypeDesc = TypeDesc::new(
    CORE_V1,
    "NamespaceSpec",
    &[FieldDesc::new("finalizers", "finalizers", STR_LIST)],
);

pub static LOCAL_OBJECT_REFERENCE: TypeDesc = TypeDesc::new(
    CORE_V1,
    "LocalObjectReference",
    &[FieldDesc::new("name", "name", STR)],
);

pub static SERVICE_ACCOUNT: TypeDesc = TypeDesc::new(
    CORE_V1,
    "ServiceAccount",
    &[
        FieldDesc::required("metadata", "metadata", Shape::Record(&OBJECT_META)),
        FieldDesc::new("automountServiceAccountToken", "automount_service_account_token", BOOL),
        FieldDesc::new("imagePullSecrets", "image_pull_secrets", Shape::Seq(&Shape::Record(&LOCAL_OBJECT_REFERENCE))),
    ],
);

pub static CONFIG_MAP: TypeDesc = TypeDesc::new(
    CORE_V1,
    "ConfigMap",
    &[
        FieldDesc::required("metadata", "metadata", Shape::Record(&OBJECT_META)),
        FieldDesc::new("data", "data", STR_MAP),
        FieldDesc::new("binaryData", "binary_data", Shape::Map(&Shape::Bytes)),
        FieldDesc::new("immutable", "immutable", BOOL),
    ],
);

pub static SECRET: TypeDesc = TypeDesc::new(
    CORE_V1,
    "Secret",
    &[
        FieldDesc::required("metadata", "metadata", Shape::Record(&OBJECT_META)),
        FieldDesc::new("type", "type_", STR),
        FieldDesc::secret("data", "data", Shape::Map(&Shape::Bytes)),
        FieldDesc::secret("stringData", "string_data", STR_MAP),
        FieldDesc::new("immutable", "immutable", BOOL),
    ],
);

pub static SERVICE: TypeDesc = TypeDesc::new(
    CORE_V1,
    "Service",
    &[
        FieldDesc::required("metadata", "metadata", Shape::Record(&OBJECT_META)),
        FieldDesc::new("spec", "spec", Shape::Optional(&Shape::Record(&SERVICE_SPEC))),
    ],
);

pub static SERVICE_SPEC: TypeDesc = TypeDesc::new(
    CORE_V1,
    "ServiceSpec",
    &[
        FieldDesc::new("type", "type_", STR),
        FieldDesc::new("selector", "selector", STR_MAP),
        FieldDesc::new("ports", "ports", Shape::Seq(&Shape::Record(&SERVICE_PORT))),
        FieldDesc::new("clusterIP", "cluster_ip", STR),
        FieldDesc::new("externalName", "external_name", STR),
        FieldDesc::new("sessionAffinity", "session_affinity", STR),
    ],
);

pub static SERVICE_PORT: TypeDesc = TypeDesc::new(
    CORE_V1,
    "ServicePort",
    &[
        FieldDesc::required("port", "port", INT),
        FieldDesc::new("name", "name", STR),
        FieldDesc::new("targetPort", "target_port", Shape::Optional(&Shape::IntOrString)),
        FieldDesc::new("nodePort", "node_port", INT),
        FieldDesc::new("protocol", "protocol", STR),
        FieldDesc::new("appProtocol", "app_protocol", STR),
    ],
);

pub static POD: TypeDesc = TypeDesc::new(
    CORE_V1,
    "Pod",
    &[
        FieldDesc::required("metadata", "metadata", Shape::Record(&OBJECT_META)),
        FieldDesc::new("spec", "spec", Shape::Optional(&Shape::Record(&POD_SPEC))),
    ],
);

pub static POD_TEMPLATE_SPEC: TypeDesc = TypeDesc::new(
    CORE_V1,
    "PodTemplateSpec",
    &[
        FieldDesc::new("metadata", "metadata", Shape::Optional(&Shape::Record(&OBJECT_META))),
        FieldDesc::new("spec", "spec", Shape::Optional(&Shape::Record(&POD_SPEC))),
    ],
);

pub static POD_SPEC: TypeDesc = TypeDesc::new(
    CORE_V1,
    "PodSpec",
    &[
        FieldDesc::required("containers", "containers", Shape::Seq(&Shape::Record(&CONTAINER))),
        FieldDesc::new("initContainers", "init_containers", Shape::Seq(&Shape::Record(&CONTAINER))),
        FieldDesc::new("volumes", "volumes", Shape::Seq(&Shape::Record(&VOLUME))),
        FieldDesc::new("serviceAccountName", "service_account_name", STR),
        FieldDesc::new("nodeSelector", "node_selector", STR_MAP),
        FieldDesc::new("restartPolicy", "restart_policy", STR),
        FieldDesc::new("terminationGracePeriodSeconds", "termination_grace_period_seconds", INT),
        FieldDesc::new("hostNetwork", "host_network", BOOL),
        FieldDesc::new("imagePullSecrets", "image_pull_secrets", Shape::Seq(&Shape::Record(&LOCAL_OBJECT_REFERENCE))),
        FieldDesc::new("priorityClassName", "priority_class_name", STR),
    ],
);

pub static CONTAINER: TypeDesc = TypeDesc::new(
    CORE_V1,
    "Container",
    &[
        FieldDesc::required("name", "name", STR),
        FieldDesc::new("image", "image", STR),
        FieldDesc::new("command", "command", STR_LIST),
        FieldDesc::new("args", "args", STR_LIST),
        FieldDesc::new("workingDir", "working_dir", STR),
        FieldDesc::new("ports", "ports", Shape::Seq(&Shape::Record(&CONTAINER_PORT))),
        FieldDesc::new("env", "env", Shape::Seq(&Shape::Record(&ENV_VAR))),
        FieldDesc::new("resources", "resources", Shape::Optional(&Shape::Record(&RESOURCE_REQUIREMENTS))),
        FieldDesc::new("volumeMounts", "volume_mounts", Shape::Seq(&Shape::Record(&VOLUME_MOUNT))),
        FieldDesc::new("livenessProbe", "liveness_probe", Shape::Optional(&Shape::Record(&PROBE))),
        FieldDesc::new("readinessProbe", "readiness_probe", Shape::Optional(&Shape::Record(&PROBE))),
        FieldDesc::new("imagePullPolicy", "image_pull_policy", STR),
    ],
);

pub static CONTAINER_PORT: TypeDesc = TypeDesc::new(
    CORE_V1,
    "ContainerPort",
    &[
        FieldDesc::required("containerPort", "container_port", INT),
        FieldDesc::new("name", "name", STR),
        FieldDesc::new("hostPort", "host_port", INT),
        FieldDesc::new("protocol", "protocol", STR),
    ],
);

pub static ENV_VAR: TypeDesc = TypeDesc::new(
    CORE_V1,
    "EnvVar",
    &[
        FieldDesc::required("name", "name", STR),
        FieldDesc::new("value", "value", STR),
        FieldDesc::new("valueFrom", "value_from", Shape::Optional(&Shape::Record(&ENV_VAR_SOURCE))),
    ],
);

pub static ENV_VAR_SOURCE: TypeDesc = TypeDesc::new(
    CORE_V1,
    "EnvVarSource",
    &[
        FieldDesc::new("configMapKeyRef", "config_map_key_ref", Shape::Optional(&Shape::Record(&CONFIG_MAP_KEY_SELECTOR))),
        FieldDesc::new("secretKeyRef", "secret_key_ref", Shape::Optional(&Shape::Record(&SECRET_KEY_SELECTOR))),
        FieldDesc::new("fieldRef", "field_ref", Shape::Optional(&Shape::Record(&OBJECT_FIELD_SELECTOR))),
    ],
);

pub static CONFIG_MAP_KEY_SELECTOR: TypeDesc = TypeDesc::new(
    CORE_V1,
    "ConfigMapKeySelector",
    &[
        FieldDesc::required("key", "key", STR),
        FieldDesc::new("name", "name", STR),
        FieldDesc::new("optional", "optional", BOOL),
    ],
);

pub static SECRET_KEY_SELECTOR: TypeDesc = TypeDesc::new(
    CORE_V1,
    "SecretKeySelector",
    &[
        FieldDesc::required("key", "key", STR),
        FieldDesc::new("name", "name", STR),
        FieldDesc::new("optional", "optional", BOOL),
    ],
);

pub static OBJECT_FIELD_SELECTOR: TypeDesc = TypeDesc::new(
    CORE_V1,
    "ObjectFieldSelector",
    &[
        FieldDesc::required("fieldPath", "field_path", STR),
        FieldDesc::new("apiVersion", "api_version", STR),
    ],
);

pub static RESOURCE_REQUIREMENTS: TypeDesc = TypeDesc::new(
    CORE_V1,
    "ResourceRequirements",
    &[
        FieldDesc::new("limits", "limits", QUANTITY_MAP),
        FieldDesc::new("requests", "requests", QUANTITY_MAP),
    ],
);

pub static VOLUME_MOUNT: TypeDesc = TypeDesc::new(
    CORE_V1,
    "VolumeMount",
    &[
        FieldDesc::required("mountPath", "mount_path", STR),
        FieldDesc::required("name", "name", STR),
        FieldDesc::new("readOnly", "read_only", BOOL),
        FieldDesc::new("subPath", "sub_path", STR),
    ],
);

pub static PROBE: TypeDesc = TypeDesc::new(
    CORE_V1,
    "Probe",
    &[
        FieldDesc::new("exec", "exec", Shape::Optional(&Shape::Record(&EXEC_ACTION))),
        FieldDesc::new("httpGet", "http_get", Shape::Optional(&Shape::Record(&HTTP_GET_ACTION))),
        FieldDesc::new("initialDelaySeconds", "initial_delay_seconds", INT),
        FieldDesc::new("periodSeconds", "period_seconds", INT),
        FieldDesc::new("timeoutSeconds", "timeout_seconds", INT),
        FieldDesc::new("successThreshold", "success_threshold", INT),
        FieldDesc::new("failureThreshold", "failure_threshold", INT),
    ],
);

pub static EXEC_ACTION: TypeDesc = TypeDesc::new(
    CORE_V1,
    "ExecAction",
    &[FieldDesc::new("command", "command", STR_LIST)],
);

pub static HTTP_GET_ACTION: TypeDesc = TypeDesc::new(
    CORE_V1,
    "HTTPGetAction",
    &[
        FieldDesc::required("port", "port", Shape::IntOrString),
        FieldDesc::new("path", "path", STR),
        FieldDesc::new("host", "host", STR),
        FieldDesc::new("scheme", "scheme", STR),
    ],
);

pub static VOLUME: TypeDesc = TypeDesc::new(
    CORE_V1,
    "Volume",
    &[
        FieldDesc::required("name", "name", STR),
        FieldDesc::new("configMap", "config_map", Shape::Optional(&Shape::Record(&CONFIG_MAP_VOLUME_SOURCE))),
        FieldDesc::new("secret", "secret", Shape::Optional(&Shape::Record(&SECRET_VOLUME_SOURCE))),
        FieldDesc::new("emptyDir", "empty_dir", Shape::Optional(&Shape::Record(&EMPTY_DIR_VOLUME_SOURCE))),
        FieldDesc::new("persistentVolumeClaim", "persistent_volume_claim", Shape::Optional(&Shape::Record(&PVC_VOLUME_SOURCE))),
    ],
);

pub static CONFIG_MAP_VOLUME_SOURCE: TypeDesc = TypeDesc::new(
    CORE_V1,
    "ConfigMapVolumeSource",
    &[
        FieldDesc::new("name", "name", STR),
        FieldDesc::new("defaultMode", "default_mode", INT),
        FieldDesc::new("optional", "optional", BOOL),
    ],
);

pub static SECRET_VOLUME_SOURCE: TypeDesc = TypeDesc::new(
    CORE_V1,
    "SecretVolumeSource",
    &[
        FieldDesc::new("secretName", "secret_name", STR),
        FieldDesc::new("defaultMode", "default_mode", INT),
        FieldDesc::new("optional", "optional", BOOL),
    ],
);

pub static EMPTY_DIR_VOLUME_SOURCE: TypeDesc = TypeDesc::new(
    CORE_V1,
    "EmptyDirVolumeSource",
    &[
        FieldDesc::new("medium", "medium", STR),
        FieldDesc::new("sizeLimit", "size_limit", Shape::Optional(&Shape::Quantity)),
    ],
);

pub static PVC_VOLUME_SOURCE: TypeDesc = TypeDesc::new(
    CORE_V1,
    "PersistentVolumeClaimVolumeSource",
    &[
        FieldDesc::required("claimName", "claim_name", STR),
        FieldDesc::new("readOnly", "read_only", BOOL),
    ],
);

// ---- apps/v1 ----

pub static DEPLOYMENT: TypeDesc = TypeDesc::new(
    APPS_V1,
    "Deployment",
    &[
        FieldDesc::required("metadata", "metadata", Shape::Record(&OBJECT_META)),
        FieldDesc::new("spec", "spec", Shape::Optional(&Shape::Record(&DEPLOYMENT_SPEC))),
    ],
);

pub static DEPLOYMENT_SPEC: TypeDesc = TypeDesc::new(
    APPS_V1,
    "DeploymentSpec",
    &[
        FieldDesc::new("replicas", "replicas", INT),
        FieldDesc::required("selector", "selector", Shape::Record(&LABEL_SELECTOR)),
        FieldDesc::required("template", "template", Shape::Record(&POD_TEMPLATE_SPEC)),
        FieldDesc::new("strategy", "strategy", Shape::Optional(&Shape::Record(&DEPLOYMENT_STRATEGY))),
        FieldDesc::new("minReadySeconds", "min_ready_seconds", INT),
        FieldDesc::new("revisionHistoryLimit", "revision_history_limit", INT),
        FieldDesc::new("progressDeadlineSeconds", "progress_deadline_seconds", INT),
        FieldDesc::new("paused", "paused", BOOL),
    ],
);

pub static DEPLOYMENT_STRATEGY: TypeDesc = TypeDesc::new(
    APPS_V1,
    "DeploymentStrategy",
    &[
        FieldDesc::new("type", "type_", STR),
        FieldDesc::new("rollingUpdate", "rolling_update", Shape::Optional(&Shape::Record(&ROLLING_UPDATE_DEPLOYMENT))),
    ],
);

pub static ROLLING_UPDATE_DEPLOYMENT: TypeDesc = TypeDesc::new(
    APPS_V1,
    "RollingUpdateDeployment",
    &[
        FieldDesc::new("maxSurge", "max_surge", Shape::Optional(&Shape::IntOrString)),
        FieldDesc::new("maxUnavailable", "max_unavailable", Shape::Optional(&Shape::IntOrString)),
    ],
);

pub static STATEFUL_SET: TypeDesc = TypeDesc::new(
    APPS_V1,
    "StatefulSet",
    &[
        FieldDesc::required("metadata", "metadata", Shape::Record(&OBJECT_META)),
        FieldDesc::new("spec", "spec", Shape::Optional(&Shape::Record(&STATEFUL_SET_SPEC))),
    ],
);

pub static STATEFUL_SET_SPEC: TypeDesc = TypeDesc::new(
    APPS_V1,
    "StatefulSetSpec",
    &[
        FieldDesc::required("serviceName", "service_name", STR),
        FieldDesc::new("replicas", "replicas", INT),
        FieldDesc::required("selector", "selector", Shape::Record(&LABEL_SELECTOR)),
        FieldDesc::required("template", "template", Shape::Record(&POD_TEMPLATE_SPEC)),
    ],
);

pub static DAEMON_SET: TypeDesc = TypeDesc::new(
    APPS_V1,
    "DaemonSet",
    &[
        FieldDesc::required("metadata", "metadata", Shape::Record(&OBJECT_META)),
        FieldDesc::new("spec", "spec", Shape::Optional(&Shape::Record(&DAEMON_SET_SPEC))),
    ],
);

pub static DAEMON_SET_SPEC: TypeDesc = TypeDesc::new(
    APPS_V1,
    "DaemonSetSpec",
    &[
        FieldDesc::required("selector", "selector", Shape::Record(&LABEL_SELECTOR)),
        FieldDesc::required("template", "template", Shape::Record(&POD_TEMPLATE_SPEC)),
        FieldDesc::new("minReadySeconds", "min_ready_seconds", INT),
    ],
);

// ---- rbac/v1 ----

pub static POLICY_RULE: TypeDesc = TypeDesc::new(
    RBAC_V1,
    "PolicyRule",
    &[
        FieldDesc::required("verbs", "verbs", STR_LIST),
        FieldDesc::new("apiGroups", "api_groups", STR_LIST),
        FieldDesc::new("resources", "resources", STR_LIST),
        FieldDesc::new("resourceNames", "resource_names", STR_LIST),
        FieldDesc::new("nonResourceURLs", "non_resource_urls", STR_LIST),
    ],
);

pub static CLUSTER_ROLE: TypeDesc = TypeDesc::new(
    RBAC_V1,
    "ClusterRole",
    &[
        FieldDesc::required("metadata", "metadata", Shape::Record(&OBJECT_META)),
        FieldDesc::new("rules", "rules", Shape::Seq(&Shape::Record(&POLICY_RULE))),
    ],
);

pub static ROLE: TypeDesc = TypeDesc::new(
    RBAC_V1,
    "Role",
    &[
        FieldDesc::required("metadata", "metadata", Shape::Record(&OBJECT_META)),
        FieldDesc::new("rules", "rules", Shape::Seq(&Shape::Record(&POLICY_RULE))),
    ],
);

pub static ROLE_REF: TypeDesc = TypeDesc::new(
    RBAC_V1,
    "RoleRef",
    &[
        FieldDesc::required("apiGroup", "api_group", STR),
        FieldDesc::required("kind", "kind", STR),
        FieldDesc::required("name", "name", STR),
    ],
);

pub static SUBJECT: TypeDesc = TypeDesc::new(
    RBAC_V1,
    "Subject",
    &[
        FieldDesc::required("kind", "kind", STR),
        FieldDesc::required("name", "name", STR),
        FieldDesc::new("apiGroup", "api_group", STR),
        FieldDesc::new("namespace", "namespace", STR),
    ],
);

pub static CLUSTER_ROLE_BINDING: TypeDesc = TypeDesc::new(
    RBAC_V1,
    "ClusterRoleBinding",
    &[
        FieldDesc::required("metadata", "metadata", Shape::Record(&OBJECT_META)),
        FieldDesc::required("roleRef", "role_ref", Shape::Record(&ROLE_REF)),
        FieldDesc::new("subjects", "subjects", Shape::Seq(&Shape::Record(&SUBJECT))),
    ],
);

pub static ROLE_BINDING: TypeDesc = TypeDesc::new(
    RBAC_V1,
    "RoleBinding",
    &[
        FieldDesc::required("metadata", "metadata", Shape::Record(&OBJECT_META)),
        FieldDesc::required("roleRef", "role_ref", Shape::Record(&ROLE_REF)),
        FieldDesc::new("subjects", "subjects", Shape::Seq(&Shape::Record(&SUBJECT))),
    ],
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renamed_fields_map_both_ways() {
        assert_eq!(SECRET.field("type").unwrap().ident, "type_");
        assert_eq!(DEPLOYMENT_SPEC.field("minReadySeconds").unwrap().ident, "min_ready_seconds");
        assert_eq!(POLICY_RULE.field("nonResourceURLs").unwrap().ident, "non_resource_urls");
    }

    #[test]
    fn secret_payload_fields_are_marked() {
        assert!(SECRET.field("data").unwrap().secret);
        assert!(SECRET.field("stringData").unwrap().secret);
        assert!(!SECRET.field("type").unwrap().secret);
        assert!(!CONFIG_MAP.field("data").unwrap().secret);
    }

    #[test]
    fn required_fields_mirror_the_concrete_types() {
        assert!(DEPLOYMENT_SPEC.field("selector").unwrap().required);
        assert!(DEPLOYMENT_SPEC.field("template").unwrap().required);
        assert!(!DEPLOYMENT_SPEC.field("replicas").unwrap().required);
        assert!(CONTAINER.field("name").unwrap().required);
        assert!(ROLE_REF.fields.iter().all(|f| f.required));
    }
}
