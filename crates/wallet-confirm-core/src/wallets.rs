//! Wallet collection with atomic account operations.

use std::collections::BTreeMap;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::AccountInfo;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WalletError {
    #[error("wallet not found: {0}")]
    WalletNotFound(String),
    #[error("account {address} not found in wallet {wallet_id}")]
    AccountNotFound { wallet_id: String, address: Address },
    #[error("account {0} already exists")]
    DuplicateAccount(Address),
    #[error("cannot remove the last visible account")]
    LastVisibleAccount,
    #[error("read-only wallets cannot derive accounts")]
    ReadOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WalletKind {
    Mnemonic,
    PrivateKey,
    ReadOnly,
    Hardware { device_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletAccount {
    pub address: Address,
    pub index: u32,
    pub label: String,
    pub color: u8,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: String,
    pub name: String,
    pub kind: WalletKind,
    pub accounts: Vec<WalletAccount>,
}

impl Wallet {
    pub fn is_hardware(&self) -> bool {
        matches!(self.kind, WalletKind::Hardware { .. })
    }

    pub fn visible_accounts(&self) -> impl Iterator<Item = &WalletAccount> {
        self.accounts.iter().filter(|a| a.visible)
    }

    fn account_mut(&mut self, address: Address) -> Option<&mut WalletAccount> {
        self.accounts.iter_mut().find(|a| a.address == address)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub wallet_id: String,
    pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub wallet_removed: bool,
    /// Set when the deleted account was selected and another one took over.
    pub new_selection: Option<Selection>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletRepository {
    wallets: BTreeMap<String, Wallet>,
    selected: Option<Selection>,
}

impl WalletRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wallets(&self) -> impl Iterator<Item = &Wallet> {
        self.wallets.values()
    }

    pub fn wallet(&self, wallet_id: &str) -> Option<&Wallet> {
        self.wallets.get(wallet_id)
    }

    pub fn selected(&self) -> Option<&Selection> {
        self.selected.as_ref()
    }

    pub fn add_wallet(&mut self, wallet: Wallet) -> Result<(), WalletError> {
        for account in &wallet.accounts {
            if self.find_wallet_with_account(account.address).is_some() {
                return Err(WalletError::DuplicateAccount(account.address));
            }
        }
        let first_visible = wallet.visible_accounts().next().map(|a| Selection {
            wallet_id: wallet.id.clone(),
            address: a.address,
        });
        self.wallets.insert(wallet.id.clone(), wallet);
        if self.selected.is_none() {
            self.selected = first_visible;
        }
        Ok(())
    }

    /// Appends a visible account with the next derivation index.
    pub fn add_account(
        &mut self,
        wallet_id: &str,
        address: Address,
        label: impl Into<String>,
        color: u8,
    ) -> Result<&WalletAccount, WalletError> {
        if self.find_wallet_with_account(address).is_some() {
            return Err(WalletError::DuplicateAccount(address));
        }
        let wallet = self
            .wallets
            .get_mut(wallet_id)
            .ok_or_else(|| WalletError::WalletNotFound(wallet_id.to_owned()))?;
        if wallet.kind == WalletKind::ReadOnly {
            return Err(WalletError::ReadOnly);
        }
        let index = wallet
            .accounts
            .iter()
            .map(|a| a.index + 1)
            .max()
            .unwrap_or(0);
        wallet.accounts.push(WalletAccount {
            address,
            index,
            label: label.into(),
            color,
            visible: true,
        });
        self.selected = Some(Selection {
            wallet_id: wallet_id.to_owned(),
            address,
        });
        let wallet = &self.wallets[wallet_id];
        Ok(&wallet.accounts[wallet.accounts.len() - 1])
    }

    pub fn rename_account(
        &mut self,
        wallet_id: &str,
        address: Address,
        label: impl Into<String>,
        color: u8,
    ) -> Result<(), WalletError> {
        let wallet = self
            .wallets
            .get_mut(wallet_id)
            .ok_or_else(|| WalletError::WalletNotFound(wallet_id.to_owned()))?;
        let account = wallet
            .account_mut(address)
            .ok_or_else(|| WalletError::AccountNotFound {
                wallet_id: wallet_id.to_owned(),
                address,
            })?;
        account.label = label.into();
        account.color = color;
        Ok(())
    }

    /// Hides an account. A wallet left without visible accounts is removed.
    pub fn delete_account(
        &mut self,
        wallet_id: &str,
        address: Address,
    ) -> Result<DeleteOutcome, WalletError> {
        let wallet = self
            .wallets
            .get(wallet_id)
            .ok_or_else(|| WalletError::WalletNotFound(wallet_id.to_owned()))?;
        if !wallet.accounts.iter().any(|a| a.address == address) {
            return Err(WalletError::AccountNotFound {
                wallet_id: wallet_id.to_owned(),
                address,
            });
        }
        let replacement = self.first_visible_except(address);
        let Some(replacement) = replacement else {
            return Err(WalletError::LastVisibleAccount);
        };

        let mut updated = wallet.clone();
        if let Some(account) = updated.account_mut(address) {
            account.visible = false;
        }
        let wallet_removed = updated.visible_accounts().next().is_none();
        if wallet_removed {
            self.wallets.remove(wallet_id);
        } else {
            self.wallets.insert(wallet_id.to_owned(), updated);
        }

        let was_selected = self
            .selected
            .as_ref()
            .is_some_and(|s| s.address == address);
        let new_selection = if was_selected {
            self.selected = Some(replacement.clone());
            Some(replacement)
        } else {
            None
        };
        Ok(DeleteOutcome {
            wallet_removed,
            new_selection,
        })
    }

    pub fn select(&mut self, address: Address) -> Result<(), WalletError> {
        let wallet = self
            .find_wallet_with_account(address)
            .ok_or_else(|| WalletError::WalletNotFound(address.to_string()))?;
        self.selected = Some(Selection {
            wallet_id: wallet.id.clone(),
            address,
        });
        Ok(())
    }

    pub fn find_wallet_with_account(&self, address: Address) -> Option<&Wallet> {
        self.wallets
            .values()
            .find(|w| w.accounts.iter().any(|a| a.address == address && a.visible))
    }

    pub fn account_info(&self, address: Address) -> AccountInfo {
        match self.find_wallet_with_account(address) {
            Some(wallet) => AccountInfo {
                address,
                label: wallet
                    .accounts
                    .iter()
                    .find(|a| a.address == address)
                    .map(|a| a.label.clone())
                    .filter(|l| !l.is_empty()),
                is_hardware_wallet: wallet.is_hardware(),
            },
            None => AccountInfo::software(address),
        }
    }

    fn first_visible_except(&self, address: Address) -> Option<Selection> {
        self.wallets.values().find_map(|w| {
            w.visible_accounts()
                .find(|a| a.address != address)
                .map(|a| Selection {
                    wallet_id: w.id.clone(),
                    address: a.address,
                })
        })
    }
}
