use crate::client::{BodyStream, Engine};
use crate::error::EngineError;
use crate::model::{
    AttachOptions, ContainerConfig, ContainerInspect, ContainerSummary, CreatedContainer,
    ExecConfig, ExecCreated, ExecStart, VersionInfo,
};
use crate::request::EngineRequest;
use crate::session::HijackedSession;

fn flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

impl Engine {
    pub async fn ping(&self) -> Result<(), EngineError> {
        self.request(EngineRequest::get("/_ping")).await.map(|_| ())
    }

    pub async fn version(&self) -> Result<VersionInfo, EngineError> {
        self.request(EngineRequest::get("/version")).await?.json()
    }

    pub async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>, EngineError> {
        self.request(EngineRequest::get("/containers/json").query("all", flag(all)))
            .await?
            .json()
    }

    pub async fn create_container(
        &self,
        name: Option<&str>,
        config: &ContainerConfig,
    ) -> Result<CreatedContainer, EngineError> {
        let mut request = EngineRequest::post("/containers/create").json(config)?;
        if let Some(name) = name {
            request = request.query("name", name);
        }
        self.request(request).await?.json()
    }

    pub async fn start_container(&self, id: &str) -> Result<(), EngineError> {
        self.request(EngineRequest::post(format!("/containers/{id}/start")).body(Vec::new()))
            .await
            .map(|_| ())
    }

    pub async fn stop_container(&self, id: &str, wait_secs: Option<u32>) -> Result<(), EngineError> {
        let mut request = EngineRequest::post(format!("/containers/{id}/stop")).body(Vec::new());
        if let Some(secs) = wait_secs {
            request = request.query("t", secs.to_string());
        }
        self.request(request).await.map(|_| ())
    }

    pub async fn remove_container(&self, id: &str, force: bool) -> Result<(), EngineError> {
        self.request(EngineRequest::delete(format!("/containers/{id}")).query("force", flag(force)))
            .await
            .map(|_| ())
    }

    pub async fn inspect_container(&self, id: &str) -> Result<ContainerInspect, EngineError> {
        self.request(EngineRequest::get(format!("/containers/{id}/json")))
            .await?
            .json()
    }

    /// Attaches to a running container. The engine upgrades the
    /// connection; output arrives demultiplexed on the session's stdout
    /// and stderr streams (or raw on stdout for tty containers).
    pub async fn attach_container(
        &self,
        id: &str,
        options: AttachOptions,
    ) -> Result<HijackedSession, EngineError> {
        let request = EngineRequest::post(format!("/containers/{id}/attach"))
            .query("stream", "1")
            .query("stdin", flag(options.stdin))
            .query("stdout", flag(options.stdout))
            .query("stderr", flag(options.stderr))
            .query("logs", flag(options.logs))
            .header("Upgrade", "tcp")
            .header("Connection", "Upgrade")
            .body(Vec::new());
        self.hijack(request).await
    }

    pub async fn create_exec(
        &self,
        container_id: &str,
        config: &ExecConfig,
    ) -> Result<ExecCreated, EngineError> {
        self.request(EngineRequest::post(format!("/containers/{container_id}/exec")).json(config)?)
            .await?
            .json()
    }

    pub async fn start_exec(&self, exec_id: &str, tty: bool) -> Result<HijackedSession, EngineError> {
        let request = EngineRequest::post(format!("/exec/{exec_id}/start"))
            .header("Upgrade", "tcp")
            .header("Connection", "Upgrade")
            .json(&ExecStart { detach: false, tty })?;
        self.hijack(request).await
    }

    /// Pulls an image. The engine reports progress as a stream of JSON
    /// lines, delivered incrementally through the returned body stream.
    pub async fn pull_image(&self, reference: &str) -> Result<BodyStream, EngineError> {
        let (tag, image) = match reference.rsplit_once(':') {
            Some((image, tag)) if !tag.contains('/') => (tag.to_string(), image.to_string()),
            _ => ("latest".to_string(), reference.to_string()),
        };
        let request = EngineRequest::post("/images/create")
            .query("fromImage", image)
            .query("tag", tag)
            .body(Vec::new());
        let (_head, body) = self.request_streamed(request).await?;
        Ok(body)
    }
}
