use app_config::DownloadConfig;
use reqwest::{Client as ReqwestClient, ClientBuilder as ReqwestClientBuilder};

pub struct Client;

impl Client {
    pub fn from_config(conf: &DownloadConfig) -> Result<ReqwestClient, reqwest::Error> {
        Self::builder(conf).build()
    }

    /// No total timeout is set, large files may take as long as they need
    /// as long as data keeps arriving.
    pub fn builder(conf: &DownloadConfig) -> ReqwestClientBuilder {
        ReqwestClient::builder()
            .user_agent(&conf.user_agent)
            .connect_timeout(conf.connect_timeout.as_duration())
            .read_timeout(conf.read_timeout.as_duration())
    }
}
