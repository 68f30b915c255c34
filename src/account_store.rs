use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use regex::Regex;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

use crate::config::PlatformConfig;
use crate::domain::{
    Account, AccountId, Clock, Error, Money, NotOperable, Principal, PrincipalId,
};

lazy_static::lazy_static! {
    static ref PHONE_REGEX: Regex = Regex::new(r"^\+?1?\d{9,15}$")
        .expect("Failed to compile phone number regex");
}

pub fn is_valid_phone_number(phone_number: &str) -> bool {
    PHONE_REGEX.is_match(phone_number)
}

#[derive(Debug, Default)]
struct Directory {
    principals: HashMap<PrincipalId, Principal>,
    by_username: HashMap<String, PrincipalId>,
    by_phone: HashMap<String, PrincipalId>,
    accounts: BTreeMap<AccountId, Arc<Mutex<Account>>>,
    platform: Option<AccountId>,
    next_principal: u32,
    next_account: u32,
}

impl Directory {
    fn insert_principal(&mut self, mut principal: Principal) -> Result<Principal, Error> {
        if self.by_username.contains_key(&principal.username) {
            return Err(Error::DuplicatePrincipal(principal.username));
        }
        if self.by_phone.contains_key(&principal.phone_number) {
            return Err(Error::DuplicatePrincipal(principal.phone_number));
        }
        self.next_principal += 1;
        principal.id = PrincipalId(self.next_principal);
        self.by_username
            .insert(principal.username.clone(), principal.id);
        self.by_phone
            .insert(principal.phone_number.clone(), principal.id);
        self.principals.insert(principal.id, principal.clone());
        Ok(principal)
    }

    fn principal_mut(&mut self, id: PrincipalId) -> Result<&mut Principal, Error> {
        self.principals
            .get_mut(&id)
            .ok_or_else(|| Error::PrincipalNotFound(id.to_string()))
    }

    fn next_account_id(&mut self) -> AccountId {
        self.next_account += 1;
        AccountId(self.next_account)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccountStats {
    pub active: usize,
    pub suspended: usize,
}

/// Owns principals and their accounts.
///
/// Each account sits behind its own async mutex; balance changes only happen
/// through a [`UnitOfWork`] obtained from [`AccountStore::begin`].
pub struct AccountStore {
    clock: Arc<dyn Clock>,
    lock_timeout: Duration,
    directory: RwLock<Directory>,
}

impl core::fmt::Debug for AccountStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AccountStore")
            .field("lock_timeout", &self.lock_timeout)
            .finish_non_exhaustive()
    }
}

impl AccountStore {
    pub fn new(clock: Arc<dyn Clock>, lock_timeout: Duration) -> Self {
        Self {
            clock,
            lock_timeout,
            directory: RwLock::new(Directory::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Directory>, Error> {
        self.directory
            .read()
            .map_err(|_| Error::Integrity("account directory lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Directory>, Error> {
        self.directory
            .write()
            .map_err(|_| Error::Integrity("account directory lock poisoned".to_string()))
    }

    /// Creates an inactive principal. No account is opened until activation.
    pub fn register_principal(
        &self,
        username: &str,
        email: &str,
        phone_number: &str,
    ) -> Result<Principal, Error> {
        let principal = Self::validated_principal(username, email, phone_number, &*self.clock)?;
        let principal = self.write()?.insert_principal(principal)?;
        info!(principal = %principal.id, username = %principal.username, "principal registered");
        Ok(principal)
    }

    fn validated_principal(
        username: &str,
        email: &str,
        phone_number: &str,
        clock: &dyn Clock,
    ) -> Result<Principal, Error> {
        let username = username.trim();
        let email = email.trim();
        let phone_number = phone_number.trim();
        if username.is_empty() {
            return Err(Error::InvalidPrincipal("username is empty".to_string()));
        }
        if !email.contains('@') {
            return Err(Error::InvalidPrincipal(format!("invalid email {}", email)));
        }
        if !is_valid_phone_number(phone_number) {
            return Err(Error::InvalidPrincipal(format!(
                "invalid phone number {}",
                phone_number
            )));
        }
        Ok(Principal {
            id: PrincipalId(0),
            username: username.to_string(),
            email: email.to_string(),
            phone_number: phone_number.to_string(),
            is_active: false,
            account: None,
            created_at: clock.now(),
        })
    }

    /// Marks the principal active and provisions its account. Runs once per
    /// principal.
    pub fn activate_principal(&self, id: PrincipalId) -> Result<AccountId, Error> {
        let now = self.clock.now();
        let mut directory = self.write()?;
        let principal = directory.principal_mut(id)?;
        if principal.account.is_some() {
            return Err(Error::AccountAlreadyProvisioned(id));
        }
        if principal.is_active {
            return Err(Error::PrincipalAlreadyActive(id));
        }
        principal.is_active = true;

        let account = directory.next_account_id();
        directory
            .accounts
            .insert(account, Arc::new(Mutex::new(Account::new(account, id, now))));
        directory.principal_mut(id)?.account = Some(account);
        info!(principal = %id, account = %account, "principal activated, account provisioned");
        Ok(account)
    }

    /// Opens the single platform account. Fails if one already exists.
    pub fn provision_platform(&self, platform: &PlatformConfig) -> Result<AccountId, Error> {
        let now = self.clock.now();
        let mut principal = Self::validated_principal(
            &platform.username,
            &platform.email,
            &platform.phone_number,
            &*self.clock,
        )?;
        principal.is_active = true;

        let mut directory = self.write()?;
        if let Some(existing) = directory.platform {
            error!(account = %existing, "attempt to provision a second platform account");
            return Err(Error::PlatformAccountDuplicated(existing));
        }
        let principal = directory.insert_principal(principal)?;
        let account = directory.next_account_id();
        directory.accounts.insert(
            account,
            Arc::new(Mutex::new(Account::platform(account, principal.id, now))),
        );
        directory.principal_mut(principal.id)?.account = Some(account);
        directory.platform = Some(account);
        info!(account = %account, "platform account provisioned");
        Ok(account)
    }

    pub fn get_platform_account(&self) -> Result<AccountId, Error> {
        let directory = self.read()?;
        match directory.platform {
            Some(id) if directory.accounts.contains_key(&id) => Ok(id),
            Some(id) => {
                error!(account = %id, "platform account reference is dangling");
                Err(Error::Integrity(format!(
                    "platform account {} is not stored",
                    id
                )))
            }
            None => {
                error!("platform account does not exist");
                Err(Error::PlatformAccountMissing)
            }
        }
    }

    /// Operable iff not suspended and the owning principal is active.
    pub fn check_operable(&self, account: &Account) -> Result<(), Error> {
        if account.is_suspended {
            return Err(Error::AccountNotOperable {
                account: account.id,
                reason: NotOperable::Suspended,
            });
        }
        let directory = self.read()?;
        let active = directory
            .principals
            .get(&account.principal)
            .map(|p| p.is_active)
            .unwrap_or(false);
        if !active {
            return Err(Error::AccountNotOperable {
                account: account.id,
                reason: NotOperable::PrincipalInactive,
            });
        }
        Ok(())
    }

    /// Maps a phone number to the account of an active principal.
    pub fn resolve_recipient(&self, lookup_key: &str) -> Result<AccountId, Error> {
        let key = lookup_key.trim();
        if !is_valid_phone_number(key) {
            return Err(Error::MalformedLookupKey(key.to_string()));
        }
        let directory = self.read()?;
        let principal = directory
            .by_phone
            .get(key)
            .and_then(|id| directory.principals.get(id))
            .filter(|p| p.is_active)
            .ok_or_else(|| Error::RecipientNotFound(key.to_string()))?;
        principal
            .account
            .ok_or(Error::RecipientHasNoAccount(principal.id))
    }

    pub fn principal(&self, id: PrincipalId) -> Result<Principal, Error> {
        self.read()?
            .principals
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::PrincipalNotFound(id.to_string()))
    }

    pub fn principal_by_username(&self, username: &str) -> Result<Principal, Error> {
        let directory = self.read()?;
        directory
            .by_username
            .get(username.trim())
            .and_then(|id| directory.principals.get(id))
            .cloned()
            .ok_or_else(|| Error::PrincipalNotFound(username.to_string()))
    }

    pub fn account_of(&self, principal: PrincipalId) -> Result<AccountId, Error> {
        self.principal(principal)?
            .account
            .ok_or(Error::NoAccount(principal))
    }

    fn handle(&self, id: AccountId) -> Result<Arc<Mutex<Account>>, Error> {
        self.read()?
            .accounts
            .get(&id)
            .cloned()
            .ok_or(Error::AccountNotFound(id))
    }

    /// Point-in-time copy of one account.
    pub async fn account(&self, id: AccountId) -> Result<Account, Error> {
        let handle = self.handle(id)?;
        let account = handle.lock().await;
        Ok(account.clone())
    }

    /// Point-in-time copies of every account, ascending by id.
    pub async fn accounts(&self) -> Result<Vec<Account>, Error> {
        let handles: Vec<_> = self.read()?.accounts.values().cloned().collect();
        let mut accounts = Vec::with_capacity(handles.len());
        for handle in handles {
            accounts.push(handle.lock().await.clone());
        }
        Ok(accounts)
    }

    pub async fn stats(&self) -> Result<AccountStats, Error> {
        let mut stats = AccountStats::default();
        for account in self.accounts().await? {
            if account.is_platform_account {
                continue;
            }
            if account.is_suspended {
                stats.suspended += 1;
            } else {
                stats.active += 1;
            }
        }
        Ok(stats)
    }

    /// Returns whether the flag changed. A no-op on the platform account.
    pub async fn suspend(&self, id: AccountId) -> Result<bool, Error> {
        let mut uow = self.begin(&[id]).await?;
        let changed = uow.account_mut(id)?.suspend();
        uow.commit();
        if changed {
            warn!(account = %id, "account suspended");
        }
        Ok(changed)
    }

    pub async fn reactivate(&self, id: AccountId) -> Result<bool, Error> {
        let mut uow = self.begin(&[id]).await?;
        let changed = uow.account_mut(id)?.reactivate();
        uow.commit();
        if changed {
            info!(account = %id, "account reactivated");
        }
        Ok(changed)
    }

    /// Locks `ids` in ascending order and opens a unit of work over them.
    pub async fn begin(&self, ids: &[AccountId]) -> Result<UnitOfWork, Error> {
        let mut ordered = ids.to_vec();
        ordered.sort();
        ordered.dedup();

        let handles = ordered
            .iter()
            .map(|id| self.handle(*id))
            .collect::<Result<Vec<_>, _>>()?;

        let acquire = async move {
            let mut guards = Vec::with_capacity(handles.len());
            for handle in handles {
                guards.push(handle.lock_owned().await);
            }
            guards
        };

        match tokio::time::timeout(self.lock_timeout, acquire).await {
            Ok(guards) => Ok(UnitOfWork::new(guards)),
            Err(_) => {
                error!(accounts = ?ordered, timeout = ?self.lock_timeout, "lock acquisition timed out");
                Err(Error::LockTimeout(ordered))
            }
        }
    }
}

/// Exclusive hold on a set of accounts.
///
/// Balances touched through it are restored on drop unless [`commit`] ran.
///
/// [`commit`]: UnitOfWork::commit
#[derive(Debug)]
pub struct UnitOfWork {
    guards: Vec<OwnedMutexGuard<Account>>,
    savepoint: Vec<Money>,
    committed: bool,
}

impl UnitOfWork {
    fn new(guards: Vec<OwnedMutexGuard<Account>>) -> Self {
        let savepoint = guards.iter().map(|g| g.balance).collect();
        Self {
            guards,
            savepoint,
            committed: false,
        }
    }

    fn position(&self, id: AccountId) -> Result<usize, Error> {
        self.guards
            .iter()
            .position(|g| g.id == id)
            .ok_or_else(|| Error::Integrity(format!("account {} is not locked", id)))
    }

    pub fn account(&self, id: AccountId) -> Result<&Account, Error> {
        let idx = self.position(id)?;
        Ok(&self.guards[idx])
    }

    fn account_mut(&mut self, id: AccountId) -> Result<&mut Account, Error> {
        let idx = self.position(id)?;
        Ok(&mut self.guards[idx])
    }

    /// Adds `delta` (possibly negative) to the balance. Preconditions are the
    /// caller's job; only overflow is checked here.
    pub fn apply_delta(&mut self, id: AccountId, delta: Money) -> Result<Money, Error> {
        let account = self.account_mut(id)?;
        let balance = account
            .balance
            .checked_add(delta)
            .ok_or(Error::BalanceOverflow(id))?;
        account.balance = balance;
        Ok(balance)
    }

    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        let mut restored = false;
        for (guard, balance) in self.guards.iter_mut().zip(&self.savepoint) {
            if guard.balance != *balance {
                guard.balance = *balance;
                restored = true;
            }
        }
        if restored {
            debug!("unit of work rolled back");
        }
    }
}
