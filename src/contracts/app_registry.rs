//! App registry bindings and wrapper
//!
//! The app registry records bot and app modules, their clients and install
//! prices, and handles installs into member accounts. Registrations are also
//! attested through an EAS-style schema whose id the registry exposes.

use alloy_network::Ethereum;
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_provider::Provider;
use alloy_rpc_types::{BlockId, TransactionRequest};
use alloy_sol_types::sol;
use tracing::{debug, info};

use crate::contracts::CallTarget;
use crate::events::{address_topics, ContractEvents, EventFilterer, EventQuery};
use crate::providers::{AlloyLogSource, TokioClock};
use crate::{spans, Result};
use IAppRegistry::{App, AppParams, IAppRegistryErrors, IAppRegistryEvents, IAppRegistryInstance};

/// JSON ABI of the app registry.
pub const ABI: &str = include_str!("../../abis/app_registry.json");

const CONTRACT: &str = "AppRegistry";

pub type AppRegistryFilterer<'a, P> =
    EventFilterer<AlloyLogSource<&'a P>, TokioClock, IAppRegistryEvents>;

/// The Towns app registry wrapper
///
/// # Example
///
/// ```rust,no_run
/// use alloy_provider::ProviderBuilder;
/// use towns_bindings::contracts::app_registry::AppRegistryContract;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = ProviderBuilder::new().connect("https://sepolia.base.org").await?;
/// let registry = AppRegistryContract::new("0x0000000000000000000000000000000000000001".parse()?, provider);
///
/// let app = "0x0000000000000000000000000000000000000002".parse()?;
/// if !registry.is_app_banned(app).await? {
///     let app_id = registry.get_latest_app_id(app).await?;
///     println!("latest id: {app_id}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct AppRegistryContract<P: Provider<Ethereum>> {
    instance: IAppRegistryInstance<P>,
    block: Option<BlockId>,
}

impl<P: Provider<Ethereum>> AppRegistryContract<P> {
    pub fn new(address: Address, provider: P) -> Self {
        debug!(
            contract_address = %address,
            event = "app_registry_contract_initialized"
        );
        Self {
            instance: IAppRegistryInstance::new(address, provider),
            block: None,
        }
    }

    /// Pin all view calls to `block`.
    pub fn at_block(mut self, block: BlockId) -> Self {
        self.block = Some(block);
        self
    }

    pub fn address(&self) -> Address {
        *self.instance.address()
    }

    pub fn instance(&self) -> &IAppRegistryInstance<P> {
        &self.instance
    }

    fn target(&self) -> CallTarget<IAppRegistryErrors> {
        CallTarget::new(CONTRACT, self.address(), self.block)
    }

    /// App registered for a client address, zero if none.
    pub async fn get_app_by_client(&self, client: Address) -> Result<Address> {
        self.target()
            .call("getAppByClient", self.instance.getAppByClient(client))
            .await
    }

    pub async fn get_app_by_id(&self, app_id: B256) -> Result<App> {
        self.target()
            .call("getAppById", self.instance.getAppById(app_id))
            .await
    }

    /// Access duration in seconds granted by one install.
    pub async fn get_app_duration(&self, app: Address) -> Result<u64> {
        let duration = self
            .target()
            .call("getAppDuration", self.instance.getAppDuration(app))
            .await?;
        Ok(duration.to::<u64>())
    }

    /// Install price of `app`, excluding the protocol fee.
    pub async fn get_app_price(&self, app: Address) -> Result<U256> {
        self.target()
            .call("getAppPrice", self.instance.getAppPrice(app))
            .await
    }

    pub async fn get_app_schema(&self) -> Result<String> {
        self.target()
            .call("getAppSchema", self.instance.getAppSchema())
            .await
    }

    pub async fn get_app_schema_id(&self) -> Result<B256> {
        self.target()
            .call("getAppSchemaId", self.instance.getAppSchemaId())
            .await
    }

    pub async fn get_latest_app_id(&self, app: Address) -> Result<B256> {
        self.target()
            .call("getLatestAppId", self.instance.getLatestAppId(app))
            .await
    }

    pub async fn is_app_banned(&self, app: Address) -> Result<bool> {
        self.target()
            .call("isAppBanned", self.instance.isAppBanned(app))
            .await
    }

    /// Create a new app module owned by `from`. Payable.
    pub fn create_app_transaction(
        &self,
        from: Address,
        params: AppParams,
        value: U256,
    ) -> TransactionRequest {
        let span = spans::build_transaction(CONTRACT, &self.address(), "createApp", &from);
        let _guard = span.enter();

        info!(
            from = %from,
            app_name = %params.name,
            client = %params.client,
            install_price = %params.installPrice,
            value = %value,
            contract_address = %self.address(),
            event = "create_app_transaction_created"
        );

        self.instance
            .createApp(params)
            .from(from)
            .value(value)
            .into_transaction_request()
    }

    /// Register an existing app module for `client`. Payable.
    pub fn register_app_transaction(
        &self,
        from: Address,
        app: Address,
        client: Address,
        value: U256,
    ) -> TransactionRequest {
        let span = spans::build_transaction(CONTRACT, &self.address(), "registerApp", &from);
        let _guard = span.enter();

        info!(
            from = %from,
            app = %app,
            client = %client,
            value = %value,
            contract_address = %self.address(),
            event = "register_app_transaction_created"
        );

        self.instance
            .registerApp(app, client)
            .from(from)
            .value(value)
            .into_transaction_request()
    }

    pub fn remove_app_transaction(&self, from: Address, app_id: B256) -> TransactionRequest {
        let span = spans::build_transaction(CONTRACT, &self.address(), "removeApp", &from);
        let _guard = span.enter();

        info!(
            from = %from,
            app_id = %app_id,
            contract_address = %self.address(),
            event = "remove_app_transaction_created"
        );

        self.instance
            .removeApp(app_id)
            .from(from)
            .into_transaction_request()
    }

    /// Install `app` into `account`.
    ///
    /// # Arguments
    ///
    /// * `from` - The account that pays and signs
    /// * `app` - The app module to install
    /// * `account` - The Space or account that receives the app
    /// * `data` - Install payload forwarded to the app
    /// * `value` - Native value attached; must cover the install price plus
    ///   protocol fee
    ///
    /// # Returns
    ///
    /// A `TransactionRequest` ready to be signed and sent
    pub fn install_app_transaction(
        &self,
        from: Address,
        app: Address,
        account: Address,
        data: Bytes,
        value: U256,
    ) -> TransactionRequest {
        let span = spans::build_transaction(CONTRACT, &self.address(), "installApp", &from);
        let _guard = span.enter();

        info!(
            from = %from,
            app = %app,
            account = %account,
            value = %value,
            contract_address = %self.address(),
            event = "install_app_transaction_created"
        );

        self.instance
            .installApp(app, account, data)
            .from(from)
            .value(value)
            .into_transaction_request()
    }

    /// Extend an install of `app` in `account`. Payable like an install.
    pub fn renew_app_transaction(
        &self,
        from: Address,
        app: Address,
        account: Address,
        data: Bytes,
        value: U256,
    ) -> TransactionRequest {
        let span = spans::build_transaction(CONTRACT, &self.address(), "renewApp", &from);
        let _guard = span.enter();

        info!(
            from = %from,
            app = %app,
            account = %account,
            value = %value,
            contract_address = %self.address(),
            event = "renew_app_transaction_created"
        );

        self.instance
            .renewApp(app, account, data)
            .from(from)
            .value(value)
            .into_transaction_request()
    }

    pub fn uninstall_app_transaction(
        &self,
        from: Address,
        app: Address,
        account: Address,
        data: Bytes,
    ) -> TransactionRequest {
        let span = spans::build_transaction(CONTRACT, &self.address(), "uninstallApp", &from);
        let _guard = span.enter();

        info!(
            from = %from,
            app = %app,
            account = %account,
            contract_address = %self.address(),
            event = "uninstall_app_transaction_created"
        );

        self.instance
            .uninstallApp(app, account, data)
            .from(from)
            .into_transaction_request()
    }

    /// Ban an app. Registry owner only.
    pub fn admin_ban_app_transaction(&self, from: Address, app: Address) -> TransactionRequest {
        let span = spans::build_transaction(CONTRACT, &self.address(), "adminBanApp", &from);
        let _guard = span.enter();

        info!(
            from = %from,
            app = %app,
            contract_address = %self.address(),
            event = "admin_ban_app_transaction_created"
        );

        self.instance
            .adminBanApp(app)
            .from(from)
            .into_transaction_request()
    }

    /// Replace the attestation schema. Registry owner only.
    pub fn admin_register_app_schema_transaction(
        &self,
        from: Address,
        schema: String,
        resolver: Address,
        revocable: bool,
    ) -> TransactionRequest {
        let span =
            spans::build_transaction(CONTRACT, &self.address(), "adminRegisterAppSchema", &from);
        let _guard = span.enter();

        info!(
            from = %from,
            resolver = %resolver,
            revocable = revocable,
            contract_address = %self.address(),
            event = "admin_register_app_schema_transaction_created"
        );

        self.instance
            .adminRegisterAppSchema(schema, resolver, revocable)
            .from(from)
            .into_transaction_request()
    }

    pub fn events(&self) -> AppRegistryFilterer<'_, P> {
        EventFilterer::new(
            self.address(),
            AlloyLogSource::new(self.instance.provider()),
            TokioClock,
        )
    }

    /// Shared by `AppRegistered`, `AppUnregistered`, `AppUpdated`,
    /// `AppCreated` and `AppBanned`, which all index only the app.
    pub fn app_query(&self, app: &[Address]) -> EventQuery {
        EventQuery::new().topic1(address_topics(app))
    }

    /// Filter for `AppInstalled`.
    ///
    /// # Arguments
    ///
    /// * `app` - Installed app modules to match, any if empty
    /// * `account` - Receiving accounts to match, any if empty
    /// * `app_id` - App ids to match, any if empty
    ///
    /// # Returns
    ///
    /// An [`EventQuery`] for [`EventFilterer::watch`] or [`EventFilterer::query`]
    pub fn app_installed_query(
        &self,
        app: &[Address],
        account: &[Address],
        app_id: &[B256],
    ) -> EventQuery {
        install_query(app, account, app_id)
    }

    pub fn app_renewed_query(
        &self,
        app: &[Address],
        account: &[Address],
        app_id: &[B256],
    ) -> EventQuery {
        install_query(app, account, app_id)
    }

    pub fn app_uninstalled_query(
        &self,
        app: &[Address],
        account: &[Address],
        app_id: &[B256],
    ) -> EventQuery {
        install_query(app, account, app_id)
    }
}

fn install_query(app: &[Address], account: &[Address], app_id: &[B256]) -> EventQuery {
    EventQuery::new()
        .topic1(address_topics(app))
        .topic2(address_topics(account))
        .topic3(app_id.iter().copied())
}

impl ContractEvents for IAppRegistryEvents {
    fn selectors() -> &'static [[u8; 32]] {
        IAppRegistryEvents::SELECTORS
    }
}

sol!(
    #[allow(missing_docs)]
    #[sol(rpc, all_derives)]
    interface IAppRegistry {
        struct AppParams {
            string name;
            bytes32[] permissions;
            address client;
            uint256 installPrice;
            uint48 accessDuration;
        }

        struct ManifestExecutionFunction {
            bytes4 executionSelector;
            bool skipRuntimeValidation;
            bool allowGlobalValidation;
        }

        struct ManifestExecutionHook {
            bytes4 executionSelector;
            uint32 entityId;
            bool isPreHook;
            bool isPostHook;
        }

        struct ExecutionManifest {
            ManifestExecutionFunction[] executionFunctions;
            ManifestExecutionHook[] executionHooks;
            bytes4[] interfaceIds;
        }

        struct App {
            bytes32 appId;
            address module;
            address owner;
            address client;
            bytes32[] permissions;
            ExecutionManifest manifest;
            uint48 duration;
        }

        event AppBanned(address indexed app, bytes32 uid);
        event AppCreated(address indexed app, bytes32 uid);
        event AppInstalled(address indexed app, address indexed account, bytes32 indexed appId);
        event AppRegistered(address indexed app, bytes32 uid);
        event AppRenewed(address indexed app, address indexed account, bytes32 indexed appId);
        event AppSchemaSet(bytes32 uid);
        event AppUninstalled(address indexed app, address indexed account, bytes32 indexed appId);
        event AppUnregistered(address indexed app, bytes32 uid);
        event AppUpdated(address indexed app, bytes32 uid);

        error AppAlreadyRegistered();
        error AppDoesNotImplementInterface();
        error AppNotInstalled();
        error AppNotRegistered();
        error AppRevoked();
        error BannedApp();
        error ClientAlreadyRegistered();
        error InsufficientPayment();
        error InvalidAddressInput();
        error InvalidAppId();
        error InvalidAppName();
        error InvalidArrayInput();
        error InvalidDuration();
        error InvalidPrice();
        error NotAllowed();
        error NotAppOwner();

        function adminBanApp(address app) external returns (bytes32);
        function adminRegisterAppSchema(string memory schema, address resolver, bool revocable) external returns (bytes32);
        function createApp(AppParams memory params) external payable returns (address app, bytes32 appId);
        function getAppByClient(address client) external view returns (address);
        function getAppById(bytes32 appId) external view returns (App memory);
        function getAppDuration(address app) external view returns (uint48);
        function getAppPrice(address app) external view returns (uint256);
        function getAppSchema() external view returns (string memory);
        function getAppSchemaId() external view returns (bytes32);
        function getLatestAppId(address app) external view returns (bytes32);
        function installApp(address app, address account, bytes memory data) external payable;
        function isAppBanned(address app) external view returns (bool);
        function registerApp(address app, address client) external payable returns (bytes32 appId);
        function removeApp(bytes32 appId) external;
        function renewApp(address app, address account, bytes memory data) external payable;
        function uninstallApp(address app, address account, bytes memory data) external;
    }
);

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, aliases::U48};
    use alloy_provider::ProviderBuilder;
    use alloy_sol_types::SolCall;

    fn registry() -> AppRegistryContract<impl Provider<Ethereum>> {
        let provider = ProviderBuilder::new().connect_http("http://localhost:8545".parse().unwrap());
        AppRegistryContract::new(address!("0000000000000000000000000000000000000a99"), provider)
    }

    #[test]
    fn test_install_app_transaction_is_payable() {
        let registry = registry();
        let from = address!("00000000000000000000000000000000000000f0");
        let app = address!("0000000000000000000000000000000000000a01");
        let account = address!("0000000000000000000000000000000000000b01");

        let tx = registry.install_app_transaction(from, app, account, Bytes::new(), U256::from(1_000));

        assert_eq!(tx.value, Some(U256::from(1_000)));
        let decoded = IAppRegistry::installAppCall::abi_decode(tx.input.input().unwrap()).unwrap();
        assert_eq!(decoded.app, app);
        assert_eq!(decoded.account, account);
    }

    #[test]
    fn test_create_app_transaction_carries_params() {
        let registry = registry();
        let params = AppParams {
            name: "greeter".to_string(),
            permissions: vec![B256::repeat_byte(1)],
            client: address!("0000000000000000000000000000000000000c01"),
            installPrice: U256::from(5),
            accessDuration: U48::from(86_400),
        };

        let tx = registry.create_app_transaction(Address::ZERO, params.clone(), U256::ZERO);
        let decoded = IAppRegistry::createAppCall::abi_decode(tx.input.input().unwrap()).unwrap();

        assert_eq!(decoded.params, params);
    }

    #[test]
    fn test_app_installed_query_topics() {
        let registry = registry();
        let account = address!("0000000000000000000000000000000000000b01");
        let query = registry.app_installed_query(&[], &[account], &[B256::repeat_byte(7)]);

        assert_eq!(query.topic1, None);
        assert_eq!(query.topic2, Some(vec![account.into_word()]));
        assert_eq!(query.topic3, Some(vec![B256::repeat_byte(7)]));
    }
}
