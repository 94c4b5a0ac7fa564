//! Default values for configuration

/// Default discovery endpoint (Meilisearch-compatible documentation index)
pub fn default_discovery_endpoint() -> String {
    std::env::var("DOCSIFT_DISCOVERY_URL").unwrap_or_else(|_| {
        "https://www.myquant.cn/Search/indexes/mq-website-docs/search".to_string()
    })
}

/// Default environment variable holding the discovery bearer token
pub fn default_discovery_api_key_env() -> String {
    "DOCSIFT_API_KEY".to_string()
}

/// Default discovery request timeout in seconds
pub fn default_discovery_timeout() -> u64 {
    15
}

/// Maximum candidate URLs requested from discovery during a full query
pub fn default_discovery_candidate_limit() -> usize {
    50
}

/// Number of hits summarised by the discover operation
pub fn default_discovery_summary_limit() -> usize {
    20
}

/// Default width of the fetch worker pool
pub fn default_fetch_concurrency() -> usize {
    5
}

/// Default delay before each fetch in milliseconds
pub fn default_fetch_request_delay_ms() -> u64 {
    1000
}

/// Default fetch timeout in seconds
pub fn default_fetch_timeout() -> u64 {
    30
}

/// Default user agent
pub fn default_fetch_user_agent() -> String {
    format!(
        "docsift/{} (+https://github.com/sealad886/docsift)",
        env!("CARGO_PKG_VERSION")
    )
}

/// Default highlight opening marker
pub fn default_highlight_pre() -> String {
    "<mark>".to_string()
}

/// Default highlight closing marker
pub fn default_highlight_post() -> String {
    "</mark>".to_string()
}

/// Compound technical terms that segmentation must never split
pub fn default_custom_terms() -> Vec<String> {
    [
        "掘金量化", "策略", "回测", "行情", "交易", "接口", "SDK", "实时行情", "历史数据", "K线",
        "分笔", "逐笔", "委托", "成交", "持仓", "账户", "资金", "风控", "滑点", "手续费", "保证金",
        "多因子", "Alpha", "量价", "技术指标", "基本面", "股票", "期货", "期权", "基金", "债券",
        "外汇", "数字货币", "Python", "C++", "C#", "MATLAB", "API", "数据查询", "下单", "撤单",
        "查询", "订阅", "推送", "回调", "事件", "MACD", "KDJ", "RSI", "布林带", "均线", "成交量",
        "换手率", "市盈率", "市净率", "ROE", "毛利率", "净利率",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Default number of results
pub fn default_query_max_results() -> usize {
    10
}

/// Upper bound on results a caller may request
pub fn default_query_results_cap() -> usize {
    100
}
